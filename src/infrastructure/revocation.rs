//! In-memory JWT revocation store
//!
//! Process-local by design: one replica, one map. Scale-out swaps this for a
//! shared TTL store behind the same port.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::application::ports::TokenRevocationStore;

/// Mutex-guarded map of revoked token → expiry (Unix seconds). Expired
/// entries are purged lazily on access.
#[derive(Default)]
pub struct InMemoryRevocationStore {
    revoked: Mutex<HashMap<String, i64>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(map: &mut HashMap<String, i64>, now: i64) {
        map.retain(|_, exp| *exp > now);
    }
}

impl TokenRevocationStore for InMemoryRevocationStore {
    fn revoke(&self, token: &str, exp: i64) {
        let now = Utc::now().timestamp();
        let mut map = self.revoked.lock().expect("revocation lock poisoned");
        Self::purge_expired(&mut map, now);
        // A token already past its expiry needs no entry.
        if exp > now {
            map.insert(token.to_string(), exp);
        }
    }

    fn is_revoked(&self, token: &str) -> bool {
        let now = Utc::now().timestamp();
        let mut map = self.revoked.lock().expect("revocation lock poisoned");
        Self::purge_expired(&mut map, now);
        map.contains_key(token)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_token_is_flagged_until_expiry() {
        let store = InMemoryRevocationStore::new();
        let exp = Utc::now().timestamp() + 3600;
        store.revoke("token-a", exp);
        assert!(store.is_revoked("token-a"));
        assert!(!store.is_revoked("token-b"));
    }

    #[test]
    fn expired_entries_are_purged_lazily() {
        let store = InMemoryRevocationStore::new();
        let past = Utc::now().timestamp() - 10;
        store.revoke("stale", past);
        assert!(!store.is_revoked("stale"));
        assert!(store.revoked.lock().unwrap().is_empty());
    }

    #[test]
    fn purge_runs_on_unrelated_reads() {
        let store = InMemoryRevocationStore::new();
        let now = Utc::now().timestamp();
        store.revoke("live", now + 3600);
        store
            .revoked
            .lock()
            .unwrap()
            .insert("dead".into(), now - 5);

        let _ = store.is_revoked("live");
        assert!(!store.revoked.lock().unwrap().contains_key("dead"));
    }
}
