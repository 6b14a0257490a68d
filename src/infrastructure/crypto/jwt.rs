//! JWT Token handling

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens. Required at startup.
    pub secret: String,
    /// Token lifetime in days
    pub expiration_days: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_days: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_days,
        }
    }
}

/// JWT Claims (HS256)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: &str, email: &str, config: &JwtConfig) -> Self {
        let now = Utc::now();
        let exp = now + Duration::days(config.expiration_days);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Create a JWT token for a user
pub fn create_token(
    user_id: &str,
    email: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(user_id, email, config);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify and decode a JWT token
pub fn verify_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    let validation = Validation::default();

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret", 7)
    }

    #[test]
    fn test_create_and_verify_token() {
        let config = config();
        let token = create_token("user-123", "laura@unisabana.edu.co", &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.email, "laura@unisabana.edu.co");
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_invalid_token() {
        let result = verify_token("invalid-token", &config());
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("user-123", "laura@unisabana.edu.co", &config()).unwrap();
        let other = JwtConfig::new("other-secret", 7);
        assert!(verify_token(&token, &other).is_err());
    }
}
