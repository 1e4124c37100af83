//! Bearer token verification
//!
//! Vouch never issues tokens; an external identity service signs them with
//! the shared HS256 secret. This module checks the signature and expiry and
//! hands back the claims naming the submitter. The one exception is dev
//! mode, where `generate_token` mints tokens for the seeded demo members.

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::VouchError;

/// Minimum secret length accepted outside dev mode
const MIN_SECRET_LEN: usize = 32;

/// Fixed signing secret for dev mode
const DEV_SECRET: &str = "vouch-dev-secret-do-not-use-in-production-0000";

/// Token payload naming the submitter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Submitter's user id as ObjectId hex
    pub sub: String,
    /// Submitter's handle, for log lines only
    pub username: String,
    /// Issued at (Unix seconds)
    pub iat: u64,
    /// Expiry (Unix seconds)
    pub exp: u64,
}

/// Verifies bearer tokens against the shared secret
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    expiry_seconds: u64,
}

impl JwtValidator {
    pub fn new(secret: String, expiry_seconds: u64) -> Result<Self, VouchError> {
        if secret.is_empty() {
            return Err(VouchError::Config("JWT secret must not be empty".into()));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(VouchError::Config(format!(
                "JWT secret must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            secret,
            expiry_seconds,
        })
    }

    /// Dev-mode validator with the well-known insecure secret
    pub fn new_dev() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            expiry_seconds: 3600,
        }
    }

    /// Mint a token for a member. Dev-mode seeding only; production tokens
    /// come from the identity service.
    pub fn generate_token(&self, user_id: &str, username: &str) -> Result<String, VouchError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| VouchError::Internal(format!("System clock error: {}", e)))?
            .as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now,
            exp: now + self.expiry_seconds,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| VouchError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Check signature and expiry, returning the claims on success
    pub fn verify(&self, token: &str) -> Result<Claims, VouchError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            let reason = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidSignature => "Invalid signature",
                ErrorKind::InvalidToken => "Invalid token",
                _ => "Token validation failed",
            };
            VouchError::Unauthorized(reason.into())
        })
    }
}

/// Pull the token out of an Authorization header value.
///
/// Accepts the usual "Bearer <token>" form; a bare token without spaces is
/// also taken, for curl convenience.
pub fn extract_token_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?.trim();

    let candidate = match header.strip_prefix("Bearer ") {
        Some(rest) => rest.trim(),
        None if !header.contains(' ') => header,
        None => return None,
    };

    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new("a-test-secret-that-is-32-chars-min!!".into(), 3600).unwrap()
    }

    #[test]
    fn test_mint_and_verify_round_trip() {
        let jwt = validator();
        let token = jwt
            .generate_token("507f191e810c19729de860ea", "hitchhiker")
            .unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, "507f191e810c19729de860ea");
        assert_eq!(claims.username, "hitchhiker");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = validator().verify("not-a-jwt").unwrap_err();
        assert!(matches!(err, VouchError::Unauthorized(_)));
    }

    #[test]
    fn test_cross_secret_rejected() {
        let other =
            JwtValidator::new("another-secret-also-32-chars-long!!!".into(), 3600).unwrap();
        let token = validator()
            .generate_token("507f191e810c19729de860ea", "hitchhiker")
            .unwrap();

        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_dev_validator_accepts_its_own_tokens() {
        let dev = JwtValidator::new_dev();
        let token = dev.generate_token("507f191e810c19729de860ea", "ada").unwrap();
        assert!(dev.verify(&token).is_ok());
    }

    #[test]
    fn test_weak_secrets_rejected() {
        assert!(JwtValidator::new(String::new(), 3600).is_err());
        assert!(JwtValidator::new("short".into(), 3600).is_err());
    }

    #[test]
    fn test_header_extraction() {
        assert_eq!(
            extract_token_from_header(Some("Bearer abc123")),
            Some("abc123")
        );
        assert_eq!(extract_token_from_header(Some("abc123")), Some("abc123"));
        assert_eq!(extract_token_from_header(Some("  Bearer abc123  ")), Some("abc123"));

        assert_eq!(extract_token_from_header(None), None);
        assert_eq!(extract_token_from_header(Some("")), None);
        assert_eq!(extract_token_from_header(Some("Bearer ")), None);
        assert_eq!(extract_token_from_header(Some("Basic abc123")), None);
    }
}
