//! User repository interface

use async_trait::async_trait;

use super::model::User;
use crate::domain::DomainResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with `Conflict` on duplicate email or
    /// university id.
    async fn insert(&self, user: User) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>>;

    /// Lookup by lowercased email.
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;

    /// Batch lookup (passenger manifest, notification fan-out).
    async fn find_by_ids(&self, ids: &[String]) -> DomainResult<Vec<User>>;

    /// Persist every mutable field of an existing user.
    async fn update(&self, user: User) -> DomainResult<()>;

    /// Replace only the password hash.
    async fn update_password(&self, user_id: &str, password_hash: &str) -> DomainResult<()>;

    /// Remove a user row. Not reachable from the API; exists so driver
    /// registration can compensate when the vehicle insert fails.
    async fn delete(&self, id: &str) -> DomainResult<()>;
}
