//! Invitation Lifecycle Manager.
//!
//! Owns the Pending → Active / Declined transitions over the credential
//! store. Notification is a side effect: its failure is logged and reported
//! back, never rolled into the state change.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use fieldgate_auth::{InvitationLinks, NewUser, SecretHasher, User, UserSummary, generate_invitation_token};
use fieldgate_core::{AppError, AppResult, RoleId, UserId};

use crate::notify::Notifier;
use crate::store::{CredentialStore, PermissionStore};

/// What `invite` did, including the links in case the notification was lost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationOutcome {
    pub user_id: UserId,
    pub email: String,
    pub role_id: RoleId,
    pub links: InvitationLinks,
    pub notified: bool,
}

pub struct InvitationManager {
    credentials: Arc<dyn CredentialStore>,
    permissions: Arc<dyn PermissionStore>,
    hasher: Arc<dyn SecretHasher>,
    notifier: Arc<dyn Notifier>,
    base_url: String,
}

impl InvitationManager {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        permissions: Arc<dyn PermissionStore>,
        hasher: Arc<dyn SecretHasher>,
        notifier: Arc<dyn Notifier>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            permissions,
            hasher,
            notifier,
            base_url: base_url.into(),
        }
    }

    async fn ensure_role(&self, role_id: RoleId) -> AppResult<()> {
        match self.permissions.role_by_id(role_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found(format!("role {role_id} not found"))),
        }
    }

    fn hash(&self, secret: &str) -> AppResult<String> {
        if secret.is_empty() {
            return Err(AppError::validation("password must not be empty"));
        }
        self.hasher
            .hash(secret)
            .map_err(|e| AppError::store(e.to_string()))
    }

    /// Create (or reset) a Pending user for `email` and send the links.
    #[instrument(skip(self), err(level = "debug"))]
    pub async fn invite(&self, email: &str, role_id: RoleId) -> AppResult<InvitationOutcome> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AppError::validation("email must not be empty"));
        }
        self.ensure_role(role_id).await?;

        let token = generate_invitation_token();
        let user = match self.credentials.user_by_username(email).await? {
            Some(mut existing) => {
                existing.reinvite(role_id, token.clone())?;
                self.credentials.save_user(&existing).await?;
                existing
            }
            None => {
                self.credentials
                    .insert_user(NewUser::invited(email, role_id, token.clone()))
                    .await?
            }
        };

        let links = InvitationLinks::new(&self.base_url, &token);
        let notified = match self.notifier.notify(email, &links).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, user_id = %user.id, "invitation notification failed; links returned to caller");
                false
            }
        };

        info!(user_id = %user.id, notified, "invitation issued");
        Ok(InvitationOutcome {
            user_id: user.id,
            email: email.to_string(),
            role_id,
            links,
            notified,
        })
    }

    /// Direct creation with a password: the user starts Active, no token.
    #[instrument(skip(self, password), err(level = "debug"))]
    pub async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password: &str,
        role_id: RoleId,
    ) -> AppResult<UserSummary> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("username must not be empty"));
        }
        self.ensure_role(role_id).await?;
        if self.credentials.user_by_username(username).await?.is_some() {
            return Err(AppError::conflict(format!("username '{username}' is already taken")));
        }

        let digest = self.hash(password)?;
        let user = self
            .credentials
            .insert_user(NewUser::active(username, email.map(str::to_string), digest, role_id))
            .await?;
        info!(user_id = %user.id, "user created");
        Ok(UserSummary::from(&user))
    }

    async fn user_by_token(&self, token: &str) -> AppResult<User> {
        self.credentials
            .user_by_token(token)
            .await?
            .ok_or_else(|| AppError::not_found("invitation token not found"))
    }

    #[instrument(skip_all, err(level = "debug"))]
    pub async fn set_password(&self, token: &str, secret: &str) -> AppResult<()> {
        let mut user = self.user_by_token(token).await?;
        let digest = self.hash(secret)?;
        user.activate(digest)?;
        self.save(&user).await?;
        info!(user_id = %user.id, "invitation accepted");
        Ok(())
    }

    #[instrument(skip_all, err(level = "debug"))]
    pub async fn decline(&self, token: &str) -> AppResult<()> {
        let mut user = self.user_by_token(token).await?;
        user.decline();
        self.save(&user).await?;
        info!(user_id = %user.id, "invitation declined");
        Ok(())
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        if self.credentials.save_user(user).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("user {} not found", user.id)))
        }
    }
}
