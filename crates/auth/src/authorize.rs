//! Pure access decisions.
//!
//! Callers perform the metadata reads and hand the results in; nothing here
//! touches storage.
//!
//! - No IO
//! - No panics
//! - Missing metadata denies

use std::collections::BTreeSet;

use serde::Serialize;

use crate::permissions::{Action, FieldAccess, FieldGrant, TableGrant};

/// Table gate.
///
/// `grant` is the role's row for the resource, `None` when no row exists.
pub fn table_decision(is_superadmin: bool, grant: Option<&TableGrant>, action: Action) -> bool {
    if is_superadmin {
        return true;
    }
    grant.is_some_and(|g| g.allows(action))
}

/// Field gate over every catalog field of a resource.
///
/// Fields without a grant row land in neither set.
pub fn field_access<'a, I>(is_superadmin: bool, fields: I) -> FieldAccess
where
    I: IntoIterator<Item = (&'a str, Option<FieldGrant>)>,
{
    if is_superadmin {
        return FieldAccess::Full;
    }

    let mut viewable = BTreeSet::new();
    let mut editable = BTreeSet::new();
    for (name, grant) in fields {
        let Some(grant) = grant else { continue };
        if grant.can_view {
            viewable.insert(name.to_string());
        }
        if grant.can_edit {
            editable.insert(name.to_string());
        }
    }
    FieldAccess::Restricted { viewable, editable }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Why a table gate decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDecisionExplanation {
    pub action: Action,
    pub granted: bool,
    pub reason: DecisionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    Superadmin,
    Granted,
    NoGrantRow,
    ColumnFalse,
}

/// Same outcome as [`table_decision`], with the reason attached (for debug logs).
pub fn explain_table_decision(
    is_superadmin: bool,
    grant: Option<&TableGrant>,
    action: Action,
) -> TableDecisionExplanation {
    let reason = match (is_superadmin, grant) {
        (true, _) => DecisionReason::Superadmin,
        (false, None) => DecisionReason::NoGrantRow,
        (false, Some(g)) if g.allows(action) => DecisionReason::Granted,
        (false, Some(_)) => DecisionReason::ColumnFalse,
    };
    TableDecisionExplanation {
        action,
        granted: matches!(reason, DecisionReason::Superadmin | DecisionReason::Granted),
        reason,
    }
}
