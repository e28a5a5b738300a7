//! User accounts and the invitation status machine.
//!
//! ```text
//! Pending ──set password──▶ Active
//!    │
//!    └──────decline───────▶ Declined
//!
//! Active/Declined ──re-invite (no password yet)──▶ Pending
//! ```
//!
//! Transitions here are pure; persistence belongs to the credential store.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fieldgate_core::{AppError, AppResult, RoleId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserStatus {
    /// Invited, no password yet.
    #[default]
    Pending,
    Active,
    Declined,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "Pending",
            UserStatus::Active => "Active",
            UserStatus::Declined => "Declined",
        }
    }
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(UserStatus::Pending),
            "Active" => Ok(UserStatus::Active),
            "Declined" => Ok(UserStatus::Declined),
            other => Err(AppError::validation(format!("unknown user status '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Fields of a user row that does not exist yet; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: RoleId,
    pub invitation_token: Option<String>,
    pub status: UserStatus,
    pub is_admin: bool,
}

impl NewUser {
    /// A Pending invitee; the email doubles as the username.
    pub fn invited(email: impl Into<String>, role_id: RoleId, token: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            username: email.clone(),
            email: Some(email),
            password_hash: None,
            role_id,
            invitation_token: Some(token.into()),
            status: UserStatus::Pending,
            is_admin: false,
        }
    }

    /// A user created with a password, skipping the invitation.
    pub fn active(
        username: impl Into<String>,
        email: Option<String>,
        password_hash: impl Into<String>,
        role_id: RoleId,
    ) -> Self {
        Self {
            username: username.into(),
            email,
            password_hash: Some(password_hash.into()),
            role_id,
            invitation_token: None,
            status: UserStatus::Active,
            is_admin: false,
        }
    }

    pub fn into_user(self, id: UserId, created_at: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            role_id: self.role_id,
            invitation_token: self.invitation_token,
            status: self.status,
            is_admin: self.is_admin,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    /// `None` until the account is activated.
    pub password_hash: Option<String>,
    pub role_id: RoleId,
    pub invitation_token: Option<String>,
    pub status: UserStatus,
    /// Required (on top of the Admin role) for user management.
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Accept the invitation with an already hashed secret.
    pub fn activate(&mut self, password_hash: String) -> AppResult<()> {
        if self.status == UserStatus::Declined {
            return Err(AppError::conflict("invitation was declined"));
        }
        self.password_hash = Some(password_hash);
        self.invitation_token = None;
        self.status = UserStatus::Active;
        Ok(())
    }

    pub fn decline(&mut self) {
        self.invitation_token = None;
        self.status = UserStatus::Declined;
    }

    /// Reset to Pending with a fresh token. Registered users cannot be re-invited.
    pub fn reinvite(&mut self, role_id: RoleId, token: String) -> AppResult<()> {
        if self.has_password() {
            return Err(AppError::conflict("user already registered"));
        }
        self.role_id = role_id;
        self.invitation_token = Some(token);
        self.status = UserStatus::Pending;
        Ok(())
    }
}

/// Public projection of a user; never carries the hash or the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub role_id: RoleId,
    pub status: UserStatus,
    pub is_admin: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role_id: user.role_id,
            status: user.status,
            is_admin: user.is_admin,
        }
    }
}
