use serde::{Deserialize, Serialize};

use fieldgate_core::RoleId;

/// Name of the role whose members bypass every permission check.
pub const SUPERADMIN_ROLE_NAME: &str = "Admin";

/// Role created alongside the superadmin at bootstrap.
pub const DEFAULT_ROLE_NAME: &str = "User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

impl Role {
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// Membership in this role short-circuits table and field gates.
    pub fn is_superadmin(&self) -> bool {
        self.name == SUPERADMIN_ROLE_NAME
    }
}

/// Trimmed role name, or `None` when blank.
pub fn normalize_role_name(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_name_is_superadmin() {
        assert!(Role::new(RoleId::new(1), "Admin").is_superadmin());
        assert!(!Role::new(RoleId::new(2), "admin").is_superadmin());
        assert!(!Role::new(RoleId::new(3), "User").is_superadmin());
    }

    #[test]
    fn blank_names_normalize_to_none() {
        assert_eq!(normalize_role_name("  Viewer "), Some("Viewer"));
        assert_eq!(normalize_role_name("   "), None);
    }
}
