//! HS256 access tokens.

use cflink_core::UserId;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims embedded in every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: UserId,
    pub username: String,
    /// Expiration (UTC Unix timestamp)
    pub exp: i64,
    /// Issued-at (UTC Unix timestamp)
    pub iat: i64,
}

/// Signing secret and token lifetime
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_mins: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiry_mins: i64) -> Self {
        Self {
            secret: secret.into(),
            expiry_mins,
        }
    }

    /// Token lifetime in seconds
    pub fn expires_in(&self) -> i64 {
        self.expiry_mins * 60
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("expiry_mins", &self.expiry_mins)
            .finish()
    }
}

/// Issue an access token for a user
pub fn generate_token(
    user_id: UserId,
    username: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: now + config.expires_in(),
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry and return the claims
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::new("test-secret-that-is-long-enough-for-hmac", 60)
    }

    #[test]
    fn test_issue_and_validate() {
        let token = generate_token(7, "admin", &config()).unwrap();
        let claims = validate_token(&token, &config()).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_fails() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            username: "admin".to_string(),
            // Well past the default leeway
            exp: now - 300,
            iat: now - 600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config().secret.as_bytes()),
        )
        .unwrap();

        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn test_foreign_secret_fails() {
        let token = generate_token(1, "admin", &config()).unwrap();
        let other = JwtConfig::new("another-secret-that-is-long-enough!!", 60);
        assert!(validate_token(&token, &other).is_err());
    }
}
