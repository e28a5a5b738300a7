//! Bearer token codec.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use thiserror::Error;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to mint token: {0}")]
    Mint(String),
}

impl From<TokenValidationError> for TokenError {
    fn from(value: TokenValidationError) -> Self {
        match value {
            TokenValidationError::Expired => TokenError::Expired,
            other => TokenError::Invalid(other.to_string()),
        }
    }
}

/// Mints and verifies bearer tokens.
///
/// Implementations must reject tampered, malformed and expired tokens.
pub trait TokenCodec: Send + Sync {
    fn mint(&self, claims: &SessionClaims) -> Result<String, TokenError>;

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError>;
}

/// HMAC-SHA256 signed JWTs.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl std::fmt::Debug for Hs256TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hs256TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec for Hs256TokenCodec {
    fn mint(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Mint(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<SessionClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        validate_claims(&data.claims, chrono::Utc::now())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use fieldgate_core::{RoleId, UserId};

    const SECRET: &[u8] = b"test-secret-key-minimum-32-characters-long";

    fn claims() -> SessionClaims {
        SessionClaims::new(UserId::new(7), "viewer@example.com", RoleId::new(3), Utc::now())
    }

    #[test]
    fn minted_token_verifies_and_carries_role() {
        let codec = Hs256TokenCodec::new(SECRET);
        let token = codec.mint(&claims()).unwrap();

        let decoded = codec.verify(&token).unwrap();
        assert_eq!(decoded.sub, UserId::new(7));
        assert_eq!(decoded.role_id, RoleId::new(3));
        assert_eq!(decoded.username, "viewer@example.com");
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let minted = Hs256TokenCodec::new(b"another-secret-another-secret-xx")
            .mint(&claims())
            .unwrap();

        let err = Hs256TokenCodec::new(SECRET).verify(&minted).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let codec = Hs256TokenCodec::new(SECRET);
        let stale = SessionClaims::new(
            UserId::new(1),
            "old",
            RoleId::new(1),
            Utc::now() - Duration::hours(48),
        );
        let token = codec.mint(&stale).unwrap();

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_invalid() {
        let codec = Hs256TokenCodec::new(SECRET);
        assert!(matches!(codec.verify("not-a-jwt"), Err(TokenError::Invalid(_))));
    }
}
