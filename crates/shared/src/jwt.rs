//! Bearer-token validation for the external identity provider.
//!
//! FamLink does not issue credentials of its own. Accounts sign up and sign
//! in against a hosted identity provider; this module validates the RS256
//! access tokens that provider issues and exposes their claims (account id
//! and role) to the API layer.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for token validation.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Claims carried by an identity-provider access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Account role as issued at sign-up: "parent" or "child"
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

/// Configuration for validating identity-provider tokens.
#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    /// Leeway in seconds for clock skew tolerance (default: 30)
    pub leeway_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("leeway_secs", &self.leeway_secs)
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// Creates a JwtConfig from the identity provider's RSA public key in
    /// PEM format.
    pub fn from_rsa_pem(public_key_pem: &str, leeway_secs: u64) -> Result<Self, JwtError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            decoding_key,
            algorithm: Algorithm::RS256,
            leeway_secs,
        })
    }

    /// Creates a JwtConfig with an HS256 symmetric secret.
    /// DO NOT use in production - only for tests.
    pub fn new_for_testing(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
            leeway_secs: 0,
        }
    }

    /// Validates a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        // Tolerate minor clock differences between the provider and us
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }
}

/// Extracts the account ID from validated claims.
pub fn extract_user_id(claims: &Claims) -> Result<Uuid, JwtError> {
    Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)
}

/// Encodes a test token with the given claims using an HS256 secret.
/// Only for tests - production tokens come from the identity provider.
pub fn encode_for_testing(secret: &str, claims: &Claims) -> String {
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(Algorithm::HS256),
        claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("test token encoding")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const TEST_SECRET: &str = "test_secret_key_for_jwt_testing_12345";

    fn test_claims(role: &str, expiry_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            role: role.to_string(),
            exp: now + expiry_offset_secs,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_validate_token_roundtrip() {
        let config = JwtConfig::new_for_testing(TEST_SECRET);
        let claims = test_claims("parent", 3600);
        let token = encode_for_testing(TEST_SECRET, &claims);

        let validated = config.validate_token(&token).unwrap();
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.role, "parent");
        assert_eq!(validated.jti, claims.jti);
    }

    #[test]
    fn test_validate_expired_token() {
        let config = JwtConfig::new_for_testing(TEST_SECRET);
        let claims = test_claims("child", -3600);
        let token = encode_for_testing(TEST_SECRET, &claims);

        let result = config.validate_token(&token);
        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_validate_wrong_secret() {
        let config = JwtConfig::new_for_testing(TEST_SECRET);
        let claims = test_claims("parent", 3600);
        let token = encode_for_testing("a_completely_different_secret", &claims);

        let result = config.validate_token(&token);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_validate_garbage_token() {
        let config = JwtConfig::new_for_testing(TEST_SECRET);
        let result = config.validate_token("not-a-jwt");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_user_id() {
        let claims = test_claims("parent", 3600);
        let id = extract_user_id(&claims).unwrap();
        assert_eq!(id.to_string(), claims.sub);
    }

    #[test]
    fn test_extract_user_id_invalid() {
        let mut claims = test_claims("parent", 3600);
        claims.sub = "not-a-uuid".to_string();
        assert!(matches!(
            extract_user_id(&claims),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = JwtConfig::new_for_testing(TEST_SECRET);
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(TEST_SECRET));
    }
}
