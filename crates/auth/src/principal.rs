use serde::{Deserialize, Serialize};

use fieldgate_core::{RoleId, UserId};

use crate::claims::SessionClaims;

/// Identity of an authenticated caller, as carried by its bearer token.
///
/// Holds no permissions: grants are always read live against `role_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role_id: RoleId,
}

impl From<SessionClaims> for Principal {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role_id: claims.role_id,
        }
    }
}
