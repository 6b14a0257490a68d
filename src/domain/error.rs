use thiserror::Error;

/// Result alias used throughout the domain and application layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Business-level errors with a stable wire taxonomy.
///
/// The string payload of most variants is the stable error code surfaced to
/// API clients (e.g. `INSUFFICIENT_SEATS`), so services raise them with the
/// code rather than prose.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Invalid shape, bounds or enum value (400).
    #[error("{0}")]
    Validation(String),

    /// Business precondition not met, e.g. expired documents (400).
    #[error("{0}")]
    Precondition(String),

    /// Missing or bad credentials, revoked token (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// Role or ownership violation (403).
    #[error("{0}")]
    Forbidden(String),

    /// Entity absent or not visible to the caller (404).
    #[error("{entity}_NOT_FOUND")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    /// Unique-key or concurrent state violation (409).
    #[error("{0}")]
    Conflict(String),

    /// Too many pending requests of a kind (429).
    #[error("{0}")]
    RateLimited(String),

    /// Upstream provider failure (502).
    #[error("{code}")]
    Dependency {
        code: String,
        provider: &'static str,
        upstream_status: Option<u16>,
    },

    /// Database not connected (503).
    #[error("{0}")]
    Unavailable(String),

    /// Anything unexpected (500). Details are logged, not surfaced.
    #[error("INTERNAL_ERROR")]
    Internal(String),
}

impl DomainError {
    pub fn validation(code: impl Into<String>) -> Self {
        Self::Validation(code.into())
    }

    pub fn precondition(code: impl Into<String>) -> Self {
        Self::Precondition(code.into())
    }

    pub fn conflict(code: impl Into<String>) -> Self {
        Self::Conflict(code.into())
    }

    pub fn forbidden(code: impl Into<String>) -> Self {
        Self::Forbidden(code.into())
    }

    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Stable code string placed in the `error` field of the JSON body.
    pub fn code(&self) -> String {
        match self {
            Self::Validation(c)
            | Self::Precondition(c)
            | Self::Unauthenticated(c)
            | Self::Forbidden(c)
            | Self::Conflict(c)
            | Self::RateLimited(c)
            | Self::Unavailable(c) => c.clone(),
            Self::NotFound { entity, .. } => format!("{}_NOT_FOUND", entity.to_uppercase()),
            Self::Dependency { code, .. } => code.clone(),
            Self::Internal(_) => "INTERNAL_ERROR".to_string(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_code_is_entity_prefixed() {
        let e = DomainError::not_found("Trip", "id", "t-1");
        assert_eq!(e.code(), "TRIP_NOT_FOUND");
    }

    #[test]
    fn taxonomy_codes_pass_through() {
        assert_eq!(
            DomainError::validation("WEAK_PASSWORD").code(),
            "WEAK_PASSWORD"
        );
        assert_eq!(
            DomainError::conflict("DUPLICATE_PLATE").code(),
            "DUPLICATE_PLATE"
        );
    }

    #[test]
    fn internal_never_leaks_detail() {
        let e = DomainError::internal("sqlite gone");
        assert_eq!(e.code(), "INTERNAL_ERROR");
        assert_eq!(e.to_string(), "INTERNAL_ERROR");
    }
}
