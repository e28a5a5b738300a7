use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fieldgate_core::{RoleId, UserId};

/// Validity window of a session token.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Bearer token claims.
///
/// The token is self-contained: it carries the role the caller acted under at
/// login time. Permission decisions still read the role's grants live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    pub username: String,

    pub role_id: RoleId,

    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for a fresh session starting at `now`.
    pub fn new(sub: UserId, username: impl Into<String>, role_id: RoleId, now: DateTime<Utc>) -> Self {
        let expires_at = now + Duration::hours(SESSION_TTL_HOURS);
        Self {
            sub,
            username: username.into(),
            role_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of decoded claims.
///
/// Signature verification happens in the token codec; this only checks times.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(now: DateTime<Utc>) -> SessionClaims {
        SessionClaims::new(UserId::new(1), "alice", RoleId::new(2), now)
    }

    #[test]
    fn fresh_claims_last_24_hours() {
        let now = Utc::now();
        let claims = claims_at(now);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
        assert!(validate_claims(&claims, now).is_ok());
    }

    #[test]
    fn expired_claims_are_rejected() {
        let issued = Utc::now() - Duration::hours(25);
        let claims = claims_at(issued);
        assert_eq!(validate_claims(&claims, Utc::now()), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_claims_are_not_yet_valid() {
        let issued = Utc::now() + Duration::hours(1);
        let claims = claims_at(issued);
        assert_eq!(validate_claims(&claims, Utc::now()), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut claims = claims_at(Utc::now());
        claims.exp = claims.iat;
        assert_eq!(
            validate_claims(&claims, Utc::now()),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
