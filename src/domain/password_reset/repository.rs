//! Password reset repository interface

use async_trait::async_trait;

use super::model::PasswordReset;
use crate::domain::DomainResult;

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Store a freshly issued token and mark every prior unused token of the
    /// same user as used, so at most one token is live per user.
    async fn issue(&self, reset: PasswordReset) -> DomainResult<()>;

    async fn find_by_token_hash(&self, token_hash: &str) -> DomainResult<Option<PasswordReset>>;

    /// Redeem a token: mark it used and swap the owner's password hash in a
    /// single transaction. Fails with `NotFound` when the token is absent.
    async fn redeem(&self, token_id: &str, new_password_hash: &str) -> DomainResult<()>;
}
