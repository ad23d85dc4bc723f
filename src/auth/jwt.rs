//! JWT token issuance and validation
//!
//! Tokens are HS256-signed bearer tokens carrying the user id, email, and
//! display name. Logout is client-side; tokens stay valid until expiry.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::{AgoraError, Result};

/// Claims embedded in every access token
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    /// User id (Mongo document id as hex)
    pub sub: String,
    /// User email
    pub email: String,
    /// Display name at time of issue
    pub name: String,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued-at, seconds since epoch
    pub iat: i64,
}

/// Issues and validates HS256 tokens with a shared secret
#[derive(Clone)]
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_seconds: i64,
}

impl JwtValidator {
    pub fn new(secret: &str, expiry_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_seconds,
        }
    }

    /// Issue a token for the given user
    pub fn issue(&self, user_id: &str, email: &str, name: &str) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            exp: now + self.expiry_seconds,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AgoraError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a token and return its claims
    ///
    /// Rejects expired tokens and bad signatures with Unauthorized.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AgoraError::Unauthorized(format!("Invalid token: {e}")))
    }
}

/// Extract the bearer token from an Authorization header value
pub fn extract_token_from_header(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("test-secret", 3600)
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = validator();
        let token = jwt.issue("user-1", "a@b.com", "Alice").unwrap();
        let claims = jwt.validate(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.name, "Alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = validator().issue("user-1", "a@b.com", "Alice").unwrap();
        let other = JwtValidator::new("other-secret", 3600);
        assert!(matches!(
            other.validate(&token),
            Err(AgoraError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // jsonwebtoken's default validation has 60s leeway
        let jwt = JwtValidator::new("test-secret", -120);
        let token = jwt.issue("user-1", "a@b.com", "Alice").unwrap();
        assert!(jwt.validate(&token).is_err());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_token_from_header("bearer abc123"), Some("abc123"));
        assert_eq!(extract_token_from_header("Basic abc123"), None);
        assert_eq!(extract_token_from_header("Bearer "), None);
    }
}
