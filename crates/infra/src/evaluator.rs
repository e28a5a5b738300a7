//! Access Evaluator: live metadata reads feeding the pure decisions in
//! `fieldgate_auth::authorize`.
//!
//! Every check reads the store; nothing is cached. A store failure denies.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use fieldgate_auth::{Action, FieldAccess, explain_table_decision, field_access};
use fieldgate_core::RoleId;

use crate::store::{PermissionStore, StoreError};

pub struct AccessEvaluator {
    permissions: Arc<dyn PermissionStore>,
}

impl AccessEvaluator {
    pub fn new(permissions: Arc<dyn PermissionStore>) -> Self {
        Self { permissions }
    }

    /// Membership in the role named "Admin". Fails closed.
    pub async fn is_superadmin(&self, role_id: RoleId) -> bool {
        match self.try_is_superadmin(role_id).await {
            Ok(bypass) => bypass,
            Err(err) => {
                warn!(%role_id, error = %err, "superadmin lookup failed; denying");
                false
            }
        }
    }

    pub async fn try_is_superadmin(&self, role_id: RoleId) -> Result<bool, StoreError> {
        Ok(self
            .permissions
            .role_by_id(role_id)
            .await?
            .is_some_and(|role| role.is_superadmin()))
    }

    /// Table gate. Missing role, resource or grant row ⇒ `false`.
    #[instrument(skip(self), fields(%role_id))]
    pub async fn can_access_table(&self, role_id: RoleId, resource: &str, action: Action) -> bool {
        match self.try_can_access_table(role_id, resource, action).await {
            Ok(allowed) => allowed,
            Err(err) => {
                warn!(error = %err, "table permission lookup failed; denying");
                false
            }
        }
    }

    async fn try_can_access_table(&self, role_id: RoleId, resource: &str, action: Action) -> Result<bool, StoreError> {
        let is_superadmin = self.try_is_superadmin(role_id).await?;
        let grant = if is_superadmin {
            None
        } else {
            match self.permissions.resource_by_name(resource).await? {
                Some(meta) => self.permissions.table_grant(role_id, meta.id).await?,
                None => None,
            }
        };

        let decision = explain_table_decision(is_superadmin, grant.as_ref(), action);
        if !decision.granted {
            debug!(reason = ?decision.reason, "table access denied");
        }
        Ok(decision.granted)
    }

    /// Field gate. Fields without a grant row are in neither set.
    #[instrument(skip(self), fields(%role_id))]
    pub async fn allowed_fields(&self, role_id: RoleId, resource: &str) -> FieldAccess {
        match self.try_allowed_fields(role_id, resource).await {
            Ok(access) => access,
            Err(err) => {
                warn!(error = %err, "field permission lookup failed; denying");
                FieldAccess::none()
            }
        }
    }

    async fn try_allowed_fields(&self, role_id: RoleId, resource: &str) -> Result<FieldAccess, StoreError> {
        if self.try_is_superadmin(role_id).await? {
            return Ok(FieldAccess::Full);
        }
        let Some(meta) = self.permissions.resource_by_name(resource).await? else {
            return Ok(FieldAccess::none());
        };

        let fields = self.permissions.fields_of(meta.id).await?;
        let grants: HashMap<_, _> = self
            .permissions
            .field_grants_for_role(role_id)
            .await?
            .into_iter()
            .collect();

        Ok(field_access(
            false,
            fields
                .iter()
                .map(|f| (f.field_name.as_str(), grants.get(&f.id).copied())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::store::InMemoryPermissionStore;
    use fieldgate_auth::{FieldGrant, TableGrant};

    struct Fixture {
        store: Arc<InMemoryPermissionStore>,
        evaluator: AccessEvaluator,
        admin: RoleId,
        viewer: RoleId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryPermissionStore::new());
        let admin = store.insert_role("Admin").await.unwrap().id;
        let viewer = store.insert_role("Viewer").await.unwrap().id;

        let employees = store.upsert_resource("employees", "Employees").await.unwrap();
        for (name, ty) in [
            ("name", DataType::Text),
            ("position", DataType::Text),
            ("salary", DataType::Number),
            ("department", DataType::Text),
        ] {
            let field = store.upsert_field(employees.id, name, ty, name == "salary").await.unwrap();
            if name != "salary" {
                store
                    .upsert_field_grant(viewer, field.id, FieldGrant { can_view: true, can_edit: false })
                    .await
                    .unwrap();
            }
        }
        store
            .upsert_table_grant(viewer, employees.id, TableGrant::default().with(Action::Read, true))
            .await
            .unwrap();

        let evaluator = AccessEvaluator::new(store.clone());
        Fixture { store, evaluator, admin, viewer }
    }

    #[tokio::test]
    async fn missing_grant_row_denies_every_action() {
        let f = fixture().await;
        let orphan = f.store.insert_role("Nobody").await.unwrap().id;
        for action in Action::ALL {
            assert!(!f.evaluator.can_access_table(orphan, "employees", action).await);
        }
    }

    #[tokio::test]
    async fn grant_columns_decide_table_access() {
        let f = fixture().await;
        assert!(f.evaluator.can_access_table(f.viewer, "employees", Action::Read).await);
        assert!(!f.evaluator.can_access_table(f.viewer, "employees", Action::Create).await);
        assert!(!f.evaluator.can_access_table(f.viewer, "projects", Action::Read).await);
    }

    #[tokio::test]
    async fn admin_role_bypasses_without_rows() {
        let f = fixture().await;
        assert!(f.evaluator.can_access_table(f.admin, "orders", Action::Delete).await);
        assert_eq!(f.evaluator.allowed_fields(f.admin, "employees").await, FieldAccess::Full);
    }

    #[tokio::test]
    async fn viewer_fields_exclude_salary() {
        let f = fixture().await;
        let access = f.evaluator.allowed_fields(f.viewer, "employees").await;
        assert!(access.can_view("name"));
        assert!(access.can_view("department"));
        assert!(!access.can_view("salary"));
        assert!(!access.can_edit("name"));
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let f = fixture().await;
        f.store.set_offline(true);
        assert!(!f.evaluator.can_access_table(f.admin, "employees", Action::Read).await);
        assert!(!f.evaluator.is_superadmin(f.admin).await);
        assert_eq!(f.evaluator.allowed_fields(f.viewer, "employees").await, FieldAccess::none());
    }
}
