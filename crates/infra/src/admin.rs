//! Admin Service: roles, table and field grants, user management.
//!
//! Every mutating entry point takes the caller's [`Principal`] and runs a
//! live guard first:
//!
//! - `require_admin`: caller's role is the superadmin role;
//! - `require_superadmin_user`: the above, plus `is_admin` on the caller's
//!   own user row (user management only).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use fieldgate_auth::roles::normalize_role_name;
use fieldgate_auth::{Action, FieldGrant, Principal, Role, UserSummary};
use fieldgate_core::{AppError, AppResult, ResourceId, RoleId, UserId};

use crate::evaluator::AccessEvaluator;
use crate::store::{CredentialStore, FieldMeta, PermissionStore, ResourceMeta};

/// One granted table action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionEntry {
    pub role_id: RoleId,
    pub resource: String,
    pub action: Action,
}

/// Field grant of one role on one field; missing rows read as false/false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPermissionEntry {
    pub resource: String,
    pub field: String,
    pub can_view: bool,
    pub can_edit: bool,
}

pub struct AdminService {
    evaluator: Arc<AccessEvaluator>,
    credentials: Arc<dyn CredentialStore>,
    permissions: Arc<dyn PermissionStore>,
}

impl AdminService {
    pub fn new(
        evaluator: Arc<AccessEvaluator>,
        credentials: Arc<dyn CredentialStore>,
        permissions: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            evaluator,
            credentials,
            permissions,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Guards
    // ─────────────────────────────────────────────────────────────────────

    pub async fn require_admin(&self, caller: &Principal) -> AppResult<()> {
        if self.evaluator.is_superadmin(caller.role_id).await {
            Ok(())
        } else {
            Err(AppError::authorization("Admin access required"))
        }
    }

    pub async fn require_superadmin_user(&self, caller: &Principal) -> AppResult<()> {
        self.require_admin(caller).await?;
        let flagged = self
            .credentials
            .user_by_id(caller.user_id)
            .await?
            .is_some_and(|u| u.is_admin);
        if flagged {
            Ok(())
        } else {
            Err(AppError::authorization("Only Superadmin can perform this action"))
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_roles(&self, caller: &Principal) -> AppResult<Vec<Role>> {
        self.require_admin(caller).await?;
        Ok(self.permissions.list_roles().await?)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn create_role(&self, caller: &Principal, name: &str) -> AppResult<Role> {
        self.require_admin(caller).await?;
        let name = normalize_role_name(name).ok_or_else(|| AppError::validation("role name must not be empty"))?;
        let role = self.permissions.insert_role(name).await?;
        info!(role_id = %role.id, "role created");
        Ok(role)
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn delete_role(&self, caller: &Principal, role_id: RoleId) -> AppResult<()> {
        self.require_admin(caller).await?;
        let role = self.role(role_id).await?;
        if role.is_superadmin() {
            return Err(AppError::conflict("the Admin role cannot be deleted"));
        }
        let members = self.credentials.count_users_with_role(role_id).await?;
        if members > 0 {
            return Err(AppError::conflict(format!(
                "role {role_id} is still assigned to {members} user(s)"
            )));
        }
        if !self.permissions.delete_role(role_id).await? {
            return Err(AppError::not_found(format!("role {role_id} not found")));
        }
        info!(%role_id, "role deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Table grants
    // ─────────────────────────────────────────────────────────────────────

    pub async fn permissions(&self, caller: &Principal, role_id: RoleId) -> AppResult<Vec<PermissionEntry>> {
        self.require_admin(caller).await?;
        self.role(role_id).await?;
        self.table_entries(role_id).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn grant(&self, caller: &Principal, role_id: RoleId, resource: &str, action: &str) -> AppResult<()> {
        self.set_table_permission(caller, role_id, resource, action, true).await
    }

    /// Sets the column to false; the grant row is kept.
    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn revoke(&self, caller: &Principal, role_id: RoleId, resource: &str, action: &str) -> AppResult<()> {
        self.set_table_permission(caller, role_id, resource, action, false).await
    }

    async fn set_table_permission(
        &self,
        caller: &Principal,
        role_id: RoleId,
        resource: &str,
        action: &str,
        allowed: bool,
    ) -> AppResult<()> {
        self.require_admin(caller).await?;
        let action: Action = action.parse()?;
        self.role(role_id).await?;
        let resource = self.resource(resource).await?;
        self.permissions
            .set_table_permission(role_id, resource.id, action, allowed)
            .await?;
        info!(%role_id, resource = %resource.name, %action, allowed, "table permission set");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Field grants
    // ─────────────────────────────────────────────────────────────────────

    pub async fn field_permissions(&self, caller: &Principal, role_id: RoleId) -> AppResult<Vec<FieldPermissionEntry>> {
        self.require_admin(caller).await?;
        self.role(role_id).await?;
        self.field_entries(role_id).await
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn set_field_permission(
        &self,
        caller: &Principal,
        role_id: RoleId,
        resource: &str,
        field: &str,
        grant: FieldGrant,
    ) -> AppResult<()> {
        self.require_admin(caller).await?;
        self.role(role_id).await?;
        let resource = self.resource(resource).await?;
        let field = self
            .permissions
            .fields_of(resource.id)
            .await?
            .into_iter()
            .find(|f| f.field_name == field)
            .ok_or_else(|| AppError::not_found(format!("field '{field}' not found on '{}'", resource.name)))?;

        self.permissions.upsert_field_grant(role_id, field.id, grant).await?;
        info!(%role_id, resource = %resource.name, field = %field.field_name, ?grant, "field permission set");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Caller self-view
    // ─────────────────────────────────────────────────────────────────────

    pub async fn my_permissions(&self, caller: &Principal) -> AppResult<Vec<PermissionEntry>> {
        if !self.evaluator.is_superadmin(caller.role_id).await {
            return self.table_entries(caller.role_id).await;
        }
        let resources = self.permissions.list_resources().await?;
        Ok(resources
            .into_iter()
            .flat_map(|r| {
                Action::ALL.into_iter().map(move |action| PermissionEntry {
                    role_id: caller.role_id,
                    resource: r.name.clone(),
                    action,
                })
            })
            .collect())
    }

    pub async fn my_field_permissions(&self, caller: &Principal) -> AppResult<Vec<FieldPermissionEntry>> {
        let mut entries = self.field_entries(caller.role_id).await?;
        if self.evaluator.is_superadmin(caller.role_id).await {
            for entry in &mut entries {
                entry.can_view = true;
                entry.can_edit = true;
            }
        }
        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_users(&self, caller: &Principal) -> AppResult<Vec<UserSummary>> {
        self.require_superadmin_user(caller).await?;
        let users = self.credentials.list_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn update_user_role(&self, caller: &Principal, user_id: UserId, role_id: RoleId) -> AppResult<UserSummary> {
        self.require_superadmin_user(caller).await?;
        let mut user = self
            .credentials
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {user_id} not found")))?;
        self.role(role_id).await?;

        user.role_id = role_id;
        if !self.credentials.save_user(&user).await? {
            return Err(AppError::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, %role_id, "user role updated");
        Ok(UserSummary::from(&user))
    }

    #[instrument(skip(self, caller), fields(caller = %caller.user_id), err(level = "debug"))]
    pub async fn delete_user(&self, caller: &Principal, user_id: UserId) -> AppResult<()> {
        self.require_superadmin_user(caller).await?;
        if caller.user_id == user_id {
            return Err(AppError::conflict("you cannot delete your own account"));
        }
        if !self.credentials.delete_user(user_id).await? {
            return Err(AppError::not_found(format!("user {user_id} not found")));
        }
        info!(%user_id, "user deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────

    async fn role(&self, role_id: RoleId) -> AppResult<Role> {
        self.permissions
            .role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("role {role_id} not found")))
    }

    async fn resource(&self, name: &str) -> AppResult<ResourceMeta> {
        self.permissions
            .resource_by_name(name)
            .await?
            .ok_or_else(|| AppError::not_found(format!("resource '{name}' not found")))
    }

    async fn table_entries(&self, role_id: RoleId) -> AppResult<Vec<PermissionEntry>> {
        let names: HashMap<ResourceId, String> = self
            .permissions
            .list_resources()
            .await?
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect();

        let grants = self.permissions.table_grants_for_role(role_id).await?;
        Ok(grants
            .into_iter()
            .filter_map(|(resource_id, grant)| names.get(&resource_id).map(|name| (name, grant)))
            .flat_map(|(name, grant)| {
                grant.allowed_actions().into_iter().map(move |action| PermissionEntry {
                    role_id,
                    resource: name.clone(),
                    action,
                })
            })
            .collect())
    }

    async fn field_entries(&self, role_id: RoleId) -> AppResult<Vec<FieldPermissionEntry>> {
        let grants: HashMap<_, _> = self
            .permissions
            .field_grants_for_role(role_id)
            .await?
            .into_iter()
            .collect();

        let mut entries = Vec::new();
        for resource in self.permissions.list_resources().await? {
            let fields: Vec<FieldMeta> = self.permissions.fields_of(resource.id).await?;
            for field in fields {
                let grant = grants.get(&field.id).copied().unwrap_or_default();
                entries.push(FieldPermissionEntry {
                    resource: resource.name.clone(),
                    field: field.field_name,
                    can_view: grant.can_view,
                    can_edit: grant.can_edit,
                });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataType;
    use crate::store::{InMemoryCredentialStore, InMemoryPermissionStore};
    use fieldgate_auth::{NewUser, TableGrant};
    use fieldgate_core::ErrorKind;

    struct Fixture {
        credentials: Arc<InMemoryCredentialStore>,
        permissions: Arc<InMemoryPermissionStore>,
        service: AdminService,
        root: Principal,
        admin_role: RoleId,
        viewer_role: RoleId,
    }

    fn principal(user_id: UserId, role_id: RoleId) -> Principal {
        Principal {
            user_id,
            username: format!("user-{user_id}"),
            role_id,
        }
    }

    async fn fixture() -> Fixture {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let permissions = Arc::new(InMemoryPermissionStore::new());
        let admin_role = permissions.insert_role("Admin").await.unwrap().id;
        let viewer_role = permissions.insert_role("Viewer").await.unwrap().id;

        let employees = permissions.upsert_resource("employees", "Employees").await.unwrap();
        permissions.upsert_field(employees.id, "name", DataType::Text, false).await.unwrap();
        permissions.upsert_field(employees.id, "salary", DataType::Number, true).await.unwrap();

        let mut root = NewUser::active("admin", None, "digest", admin_role);
        root.is_admin = true;
        let root = credentials.insert_user(root).await.unwrap();

        let evaluator = Arc::new(AccessEvaluator::new(permissions.clone()));
        let service = AdminService::new(evaluator, credentials.clone(), permissions.clone());
        Fixture {
            credentials,
            permissions,
            service,
            root: principal(root.id, admin_role),
            admin_role,
            viewer_role,
        }
    }

    #[tokio::test]
    async fn non_admin_role_is_forbidden() {
        let f = fixture().await;
        let viewer = principal(UserId::new(99), f.viewer_role);
        let err = f.service.list_roles(&viewer).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = f.service.create_role(&viewer, "Sneaky").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn role_creation_validates_names() {
        let f = fixture().await;
        let role = f.service.create_role(&f.root, "  Editor ").await.unwrap();
        assert_eq!(role.name, "Editor");

        let err = f.service.create_role(&f.root, "   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = f.service.create_role(&f.root, "Editor").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn referenced_role_cannot_be_deleted() {
        let f = fixture().await;
        f.credentials
            .insert_user(NewUser::invited("v@example.com", f.viewer_role, "tok"))
            .await
            .unwrap();

        let err = f.service.delete_role(&f.root, f.viewer_role).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(f.permissions.role_by_id(f.viewer_role).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn admin_role_is_protected_and_unknown_role_is_not_found() {
        let f = fixture().await;
        let err = f.service.delete_role(&f.root, f.admin_role).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err = f.service.delete_role(&f.root, RoleId::new(404)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unreferenced_role_deletion_cascades_grants() {
        let f = fixture().await;
        f.service.grant(&f.root, f.viewer_role, "employees", "read").await.unwrap();
        f.service.delete_role(&f.root, f.viewer_role).await.unwrap();
        assert!(f.permissions.table_grants_for_role(f.viewer_role).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn grant_then_revoke_keeps_the_row() {
        let f = fixture().await;
        f.service.grant(&f.root, f.viewer_role, "employees", "read").await.unwrap();
        f.service.grant(&f.root, f.viewer_role, "employees", "update").await.unwrap();

        let entries = f.service.permissions(&f.root, f.viewer_role).await.unwrap();
        let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![Action::Read, Action::Update]);

        f.service.revoke(&f.root, f.viewer_role, "employees", "read").await.unwrap();
        let grants = f.permissions.table_grants_for_role(f.viewer_role).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].1, TableGrant::default().with(Action::Update, true));
    }

    #[tokio::test]
    async fn revoke_without_row_creates_all_false_row() {
        let f = fixture().await;
        f.service.revoke(&f.root, f.viewer_role, "employees", "delete").await.unwrap();
        let grants = f.permissions.table_grants_for_role(f.viewer_role).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].1, TableGrant::default());
    }

    #[tokio::test]
    async fn grant_inputs_are_checked() {
        let f = fixture().await;
        let err = f.service.grant(&f.root, f.viewer_role, "employees", "view").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = f.service.grant(&f.root, f.viewer_role, "payroll", "read").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = f.service.grant(&f.root, RoleId::new(404), "employees", "read").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn field_permissions_report_missing_rows_as_false() {
        let f = fixture().await;
        f.service
            .set_field_permission(&f.root, f.viewer_role, "employees", "name", FieldGrant { can_view: true, can_edit: false })
            .await
            .unwrap();

        let entries = f.service.field_permissions(&f.root, f.viewer_role).await.unwrap();
        assert_eq!(
            entries,
            vec![
                FieldPermissionEntry { resource: "employees".into(), field: "name".into(), can_view: true, can_edit: false },
                FieldPermissionEntry { resource: "employees".into(), field: "salary".into(), can_view: false, can_edit: false },
            ]
        );

        let err = f
            .service
            .set_field_permission(&f.root, f.viewer_role, "employees", "bonus", FieldGrant::FULL)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn self_view_of_superadmin_is_everything() {
        let f = fixture().await;
        let perms = f.service.my_permissions(&f.root).await.unwrap();
        assert_eq!(perms.len(), Action::ALL.len());
        let fields = f.service.my_field_permissions(&f.root).await.unwrap();
        assert!(fields.iter().all(|e| e.can_view && e.can_edit));

        let viewer = principal(UserId::new(99), f.viewer_role);
        assert!(f.service.my_permissions(&viewer).await.unwrap().is_empty());
        let fields = f.service.my_field_permissions(&viewer).await.unwrap();
        assert!(fields.iter().all(|e| !e.can_view && !e.can_edit));
    }

    #[tokio::test]
    async fn user_management_needs_the_superadmin_flag() {
        let f = fixture().await;
        let plain = f
            .credentials
            .insert_user(NewUser::active("second-admin", None, "digest", f.admin_role))
            .await
            .unwrap();
        let caller = principal(plain.id, f.admin_role);

        f.service.list_roles(&caller).await.unwrap();
        let err = f.service.list_users(&caller).await.unwrap_err();
        assert_eq!(err, AppError::authorization("Only Superadmin can perform this action"));
    }

    #[tokio::test]
    async fn users_can_be_moved_and_deleted_but_not_self() {
        let f = fixture().await;
        let bob = f
            .credentials
            .insert_user(NewUser::invited("bob@example.com", f.viewer_role, "tok"))
            .await
            .unwrap();

        let moved = f.service.update_user_role(&f.root, bob.id, f.admin_role).await.unwrap();
        assert_eq!(moved.role_id, f.admin_role);
        let err = f.service.update_user_role(&f.root, bob.id, RoleId::new(404)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f.service.delete_user(&f.root, f.root.user_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        f.service.delete_user(&f.root, bob.id).await.unwrap();
        let err = f.service.delete_user(&f.root, bob.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.service.list_users(&f.root).await.unwrap().len(), 1);
    }
}
