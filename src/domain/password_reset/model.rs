//! Password reset token

use chrono::{DateTime, Duration, Utc};

/// How long a reset token stays redeemable.
///
/// The tighter of the two windows found in the wild; documented in DESIGN.md.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 15;

/// One-shot password reset token.
///
/// Only the sha-256 hash of the secret is ever stored; the raw token leaves
/// the process exclusively through the email sender.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub id: String,
    pub user_id: String,
    /// Hex-encoded sha-256 of the 32-byte secret. Unique.
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn issue(id: String, user_id: String, token_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            token_hash,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            used: false,
            created_at: now,
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && now <= self.expires_at
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_redeemable() {
        let now = Utc::now();
        let t = PasswordReset::issue("pr-1".into(), "u-1".into(), "hash".into(), now);
        assert!(t.is_redeemable(now));
        assert_eq!(t.expires_at - now, Duration::minutes(15));
    }

    #[test]
    fn used_token_is_not_redeemable() {
        let now = Utc::now();
        let mut t = PasswordReset::issue("pr-1".into(), "u-1".into(), "hash".into(), now);
        t.used = true;
        assert!(!t.is_redeemable(now));
    }

    #[test]
    fn expired_token_is_not_redeemable() {
        let now = Utc::now();
        let t = PasswordReset::issue("pr-1".into(), "u-1".into(), "hash".into(), now);
        assert!(!t.is_redeemable(now + Duration::minutes(16)));
    }
}
