use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use fieldgate_core::AppError;

/// Table-level operation a caller asks to perform on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Action::Read),
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(AppError::validation(format!("invalid action '{other}'"))),
        }
    }
}

/// The four table-level booleans of a role on one resource.
///
/// A missing grant row is equivalent to `TableGrant::default()` (all false).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrant {
    pub can_view: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl TableGrant {
    pub const FULL: TableGrant = TableGrant {
        can_view: true,
        can_create: true,
        can_update: true,
        can_delete: true,
    };

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::Read => self.can_view,
            Action::Create => self.can_create,
            Action::Update => self.can_update,
            Action::Delete => self.can_delete,
        }
    }

    /// Copy of `self` with the column for `action` set to `value`.
    pub fn with(mut self, action: Action, value: bool) -> Self {
        match action {
            Action::Read => self.can_view = value,
            Action::Create => self.can_create = value,
            Action::Update => self.can_update = value,
            Action::Delete => self.can_delete = value,
        }
        self
    }

    /// Actions this grant allows, in `Action::ALL` order.
    pub fn allowed_actions(&self) -> Vec<Action> {
        Action::ALL.into_iter().filter(|a| self.allows(*a)).collect()
    }
}

/// Field-level booleans of a role on one resource field.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGrant {
    pub can_view: bool,
    pub can_edit: bool,
}

impl FieldGrant {
    pub const FULL: FieldGrant = FieldGrant {
        can_view: true,
        can_edit: true,
    };
}

/// Result of the field gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAccess {
    /// Superadmin: no projection and no payload filtering.
    Full,
    Restricted {
        viewable: BTreeSet<String>,
        editable: BTreeSet<String>,
    },
}

impl FieldAccess {
    /// Deny-everything field access.
    pub fn none() -> Self {
        FieldAccess::Restricted {
            viewable: BTreeSet::new(),
            editable: BTreeSet::new(),
        }
    }

    pub fn can_view(&self, field: &str) -> bool {
        match self {
            FieldAccess::Full => true,
            FieldAccess::Restricted { viewable, .. } => viewable.contains(field),
        }
    }

    pub fn can_edit(&self, field: &str) -> bool {
        match self {
            FieldAccess::Full => true,
            FieldAccess::Restricted { editable, .. } => editable.contains(field),
        }
    }
}
