//! Access tokens and password hashing.
//!
//! Tokens are short-lived HS256 JWTs carrying the user id; there is no
//! refresh flow, clients re-login when a token expires. Passwords are
//! hashed with Argon2id using a per-password salt.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const TOKEN_AUDIENCE: &str = "corkboard";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

/// Claims embedded in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// User ID the token authenticates
    pub sub: Uuid,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience - always "corkboard"
    pub aud: String,
}

/// Decoded identity extracted from a valid token.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: ChronoDuration,
}

impl JwtService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: ChronoDuration::seconds(ttl.as_secs() as i64),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<TokenIdentity, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.leeway = 30; // clock skew

        let data = decode::<AccessTokenClaims>(token, &self.decoding, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            },
        )?;

        let expires_at = DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
            .ok_or(AuthError::InvalidToken)?;

        Ok(TokenIdentity {
            user_id: data.claims.sub,
            expires_at,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new("test-secret", Duration::from_secs(3600))
    }

    #[test]
    fn issue_and_validate_roundtrip() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc.issue(user_id).unwrap();
        let identity = svc.validate(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert!(identity.expires_at > Utc::now());
    }

    #[test]
    fn validate_rejects_garbage() {
        let svc = service();
        assert!(matches!(
            svc.validate("not-a-token"),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(svc.validate(""), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn validate_rejects_wrong_secret() {
        let svc = service();
        let other = JwtService::new("different-secret", Duration::from_secs(3600));
        let token = svc.issue(Uuid::new_v4()).unwrap();
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).is_ok());
        assert!(matches!(
            verify_password("hunter3", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }
}
