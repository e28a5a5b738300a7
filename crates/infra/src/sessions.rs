//! Auth Session Issuer.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument};

use fieldgate_auth::{Principal, SecretHasher, SessionClaims, TokenCodec, TokenError};
use fieldgate_core::{AppError, AppResult, RoleId, UserId};

use crate::store::CredentialStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub role_id: RoleId,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

/// Verifies credentials and mints bearer tokens. Stateless: a token stays
/// valid until it expires.
pub struct SessionIssuer {
    credentials: Arc<dyn CredentialStore>,
    hasher: Arc<dyn SecretHasher>,
    codec: Arc<dyn TokenCodec>,
}

impl SessionIssuer {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        hasher: Arc<dyn SecretHasher>,
        codec: Arc<dyn TokenCodec>,
    ) -> Self {
        Self {
            credentials,
            hasher,
            codec,
        }
    }

    #[instrument(skip(self, password), err(level = "debug"))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let user = self
            .credentials
            .user_by_username(username)
            .await?
            .ok_or_else(|| AppError::authentication("user not found"))?;

        let Some(digest) = user.password_hash.as_deref() else {
            return Err(AppError::authentication("pending activation"));
        };
        if !self.hasher.verify(password, digest) {
            return Err(AppError::authentication("invalid credentials"));
        }

        let claims = SessionClaims::new(user.id, &user.username, user.role_id, Utc::now());
        let token = self
            .codec
            .mint(&claims)
            .map_err(|e| AppError::store(e.to_string()))?;

        info!(user_id = %user.id, role_id = %user.role_id, "session issued");
        Ok(Session {
            token,
            user: SessionUser {
                id: user.id,
                username: user.username,
                role_id: user.role_id,
            },
        })
    }

    /// Resolve a bearer token to the caller it was minted for.
    pub fn authenticate(&self, token: &str) -> AppResult<Principal> {
        match self.codec.verify(token) {
            Ok(claims) => Ok(Principal::from(claims)),
            Err(TokenError::Expired) => Err(AppError::authentication("token has expired")),
            Err(err) => {
                debug!(error = %err, "bearer token rejected");
                Err(AppError::authentication("invalid token"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryCredentialStore;
    use fieldgate_auth::{Argon2Hasher, Hs256TokenCodec, NewUser};
    use fieldgate_core::ErrorKind;

    struct Fixture {
        credentials: Arc<InMemoryCredentialStore>,
        codec: Arc<Hs256TokenCodec>,
        issuer: SessionIssuer,
    }

    fn fixture() -> Fixture {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let codec = Arc::new(Hs256TokenCodec::new(b"session-test-secret"));
        let issuer = SessionIssuer::new(credentials.clone(), Arc::new(Argon2Hasher), codec.clone());
        Fixture { credentials, codec, issuer }
    }

    async fn seed_active(f: &Fixture, username: &str, password: &str, role: i64) -> UserId {
        let digest = Argon2Hasher.hash(password).unwrap();
        f.credentials
            .insert_user(NewUser::active(username, None, digest, RoleId::new(role)))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn login_embeds_role_in_token() {
        let f = fixture();
        let id = seed_active(&f, "alice", "pw", 3).await;

        let session = f.issuer.login("alice", "pw").await.unwrap();
        assert_eq!(session.user.id, id);
        assert_eq!(session.user.role_id, RoleId::new(3));

        let claims = f.codec.verify(&session.token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role_id, RoleId::new(3));
        assert_eq!(claims.exp - claims.iat, 24 * 3600);

        let principal = f.issuer.authenticate(&session.token).unwrap();
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() {
        let f = fixture();
        seed_active(&f, "alice", "pw", 3).await;
        f.credentials
            .insert_user(NewUser::invited("bob@example.com", RoleId::new(3), "tok"))
            .await
            .unwrap();

        let cases = [
            ("nobody", "pw", "user not found"),
            ("bob@example.com", "pw", "pending activation"),
            ("alice", "wrong", "invalid credentials"),
        ];
        for (username, password, expected) in cases {
            let err = f.issuer.login(username, password).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication);
            assert_eq!(err, AppError::authentication(expected));
        }
    }

    #[test]
    fn garbage_token_is_unauthenticated() {
        let f = fixture();
        let err = f.issuer.authenticate("not-a-jwt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let f = fixture();
        let other = Hs256TokenCodec::new(b"someone-else");
        let claims = SessionClaims::new(UserId::new(1), "mallory", RoleId::new(1), Utc::now());
        let forged = other.mint(&claims).unwrap();
        assert!(f.issuer.authenticate(&forged).is_err());
    }
}
