//! Store capabilities.
//!
//! Three narrow traits split the relational store by concern. Each has an
//! in-memory implementation for tests/dev and a Postgres implementation.
//! Services hold them as `Arc<dyn …Store>`.
//!
//! ## Error mapping
//!
//! | StoreError | AppError |
//! |------------|----------|
//! | `UniqueViolation` | `Conflict` |
//! | `ForeignKeyViolation` | `Conflict` |
//! | `NotNullViolation` | `Validation` |
//! | anything else | `Store` |
//!
//! The driver detail is logged here and never copied into the `AppError`;
//! callers only see the classified message.

use async_trait::async_trait;
use thiserror::Error;

use fieldgate_auth::{Action, FieldGrant, NewUser, Role, TableGrant, User};
use fieldgate_core::{AppError, FieldId, RecordId, ResourceId, RoleId, UserId};

use crate::catalog::{DataType, ResourceDef};
use crate::record::{FieldValues, Record};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCredentialStore, InMemoryPermissionStore, InMemoryRecordStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("row is still referenced: {0}")]
    ForeignKeyViolation(String),

    #[error("required column is null: {0}")]
    NotNullViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("unreadable row: {0}")]
    Decode(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(_) | StoreError::ForeignKeyViolation(_) => {
                tracing::warn!(error = %err, "store rejected a write");
                AppError::conflict("conflicts with existing data")
            }
            StoreError::NotNullViolation(_) => {
                tracing::warn!(error = %err, "store rejected a write");
                AppError::validation("a required field is missing")
            }
            other => {
                tracing::error!(error = %other, "store operation failed");
                AppError::store("internal store error")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata rows
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMeta {
    pub id: ResourceId,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub id: FieldId,
    pub resource_id: ResourceId,
    pub field_name: String,
    pub data_type: DataType,
    pub is_sensitive: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// User identities, password hashes, invitation tokens and account status.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user; a taken username is `UniqueViolation`.
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Overwrite every mutable column of an existing user. `false` if the id is unknown.
    async fn save_user(&self, user: &User) -> Result<bool, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError>;

    /// All users, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;

    async fn count_users_with_role(&self, role_id: RoleId) -> Result<u64, StoreError>;
}

/// Roles, the resource catalog metadata, and both grant tables.
///
/// Absent grant rows are reported as `None`, never as an error.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// All roles, ordered by id.
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    async fn role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError>;

    /// A taken name is `UniqueViolation`.
    async fn insert_role(&self, name: &str) -> Result<Role, StoreError>;

    /// Removes the role and cascades its grant rows. `false` if unknown.
    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError>;

    /// Insert or refresh a resource by name.
    async fn upsert_resource(&self, name: &str, display_name: &str) -> Result<ResourceMeta, StoreError>;

    /// All resources, ordered by id.
    async fn list_resources(&self) -> Result<Vec<ResourceMeta>, StoreError>;

    async fn resource_by_name(&self, name: &str) -> Result<Option<ResourceMeta>, StoreError>;

    /// Insert or refresh a field by (resource, name).
    async fn upsert_field(
        &self,
        resource_id: ResourceId,
        field_name: &str,
        data_type: DataType,
        is_sensitive: bool,
    ) -> Result<FieldMeta, StoreError>;

    /// Fields of one resource, ordered by id.
    async fn fields_of(&self, resource_id: ResourceId) -> Result<Vec<FieldMeta>, StoreError>;

    async fn table_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<TableGrant>, StoreError>;

    /// Every table grant row of a role, ordered by resource id.
    async fn table_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(ResourceId, TableGrant)>, StoreError>;

    async fn upsert_table_grant(&self, role_id: RoleId, resource_id: ResourceId, grant: TableGrant)
    -> Result<(), StoreError>;

    /// Upsert a single column of a table grant row, leaving the others as
    /// they are (all-false for a fresh row).
    async fn set_table_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action: Action,
        allowed: bool,
    ) -> Result<(), StoreError>;

    /// Every field grant row of a role, keyed by field id.
    async fn field_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(FieldId, FieldGrant)>, StoreError>;

    async fn upsert_field_grant(&self, role_id: RoleId, field_id: FieldId, grant: FieldGrant) -> Result<(), StoreError>;
}

/// Dynamic CRUD over the business tables named by the catalog.
///
/// Implementations only ever see catalog-derived identifiers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every row, ordered by id, with only `columns` populated.
    async fn list(&self, resource: &'static ResourceDef, columns: &[&'static str]) -> Result<Vec<Record>, StoreError>;

    async fn insert(&self, resource: &'static ResourceDef, values: &FieldValues) -> Result<RecordId, StoreError>;

    /// `false` if no row has `id`. `values` is never empty.
    async fn update(&self, resource: &'static ResourceDef, id: RecordId, values: &FieldValues)
    -> Result<bool, StoreError>;

    async fn delete(&self, resource: &'static ResourceDef, id: RecordId) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldgate_core::ErrorKind;

    #[test]
    fn store_errors_classify_into_app_errors() {
        let unique: AppError = StoreError::UniqueViolation("roles.name".into()).into();
        assert_eq!(unique.kind(), ErrorKind::Conflict);

        let fk: AppError = StoreError::ForeignKeyViolation("users.role_id".into()).into();
        assert_eq!(fk.kind(), ErrorKind::Conflict);

        let not_null: AppError = StoreError::NotNullViolation("employees.name".into()).into();
        assert_eq!(not_null.kind(), ErrorKind::Validation);

        let down: AppError = StoreError::Unavailable("pool closed".into()).into();
        assert_eq!(down.kind(), ErrorKind::Store);
    }

    #[test]
    fn driver_detail_is_not_carried_into_app_errors() {
        let detail = "insert_record failed: null value in column \"name\" of relation \"employees\"";
        for err in [
            StoreError::Query(detail.into()),
            StoreError::UniqueViolation(detail.into()),
            StoreError::ForeignKeyViolation(detail.into()),
            StoreError::NotNullViolation(detail.into()),
            StoreError::Decode(detail.into()),
        ] {
            let app: AppError = err.into();
            assert!(!app.to_string().contains("employees"), "leaked: {app}");
        }
        assert_eq!(
            AppError::from(StoreError::Query(detail.into())),
            AppError::store("internal store error")
        );
    }
}
