//! In-memory stores for tests/dev.
//!
//! Each store keeps its rows behind a single `RwLock` and reproduces the
//! constraints the Postgres schema enforces (unique names, unique tokens,
//! grant cascades on role deletion).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use fieldgate_auth::{Action, FieldGrant, NewUser, Role, TableGrant, User};
use fieldgate_core::{FieldId, RecordId, ResourceId, RoleId, UserId};

use super::{CredentialStore, FieldMeta, PermissionStore, RecordStore, ResourceMeta, StoreError};
use crate::catalog::{DataType, ResourceDef};
use crate::record::{FieldValue, FieldValues, Record};

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read().map_err(|_| poisoned())
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write().map_err(|_| poisoned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct CredentialState {
    last_id: i64,
    users: BTreeMap<UserId, User>,
}

impl CredentialState {
    fn check_unique(&self, except: Option<UserId>, username: &str, token: Option<&str>) -> Result<(), StoreError> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.username == username {
                return Err(StoreError::UniqueViolation(format!("username '{username}' is taken")));
            }
            if token.is_some() && user.invitation_token.as_deref() == token {
                return Err(StoreError::UniqueViolation("invitation token collision".to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<CredentialState>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = write(&self.inner)?;
        state.check_unique(None, &user.username, user.invitation_token.as_deref())?;
        state.last_id += 1;
        let user = user.into_user(UserId::new(state.last_id), Utc::now());
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut state = write(&self.inner)?;
        if !state.users.contains_key(&user.id) {
            return Ok(false);
        }
        state.check_unique(Some(user.id), &user.username, user.invitation_token.as_deref())?;
        state.users.insert(user.id, user.clone());
        Ok(true)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(read(&self.inner)?.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(read(&self.inner)?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn user_by_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        Ok(read(&self.inner)?
            .users
            .values()
            .find(|u| u.invitation_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(read(&self.inner)?.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        Ok(write(&self.inner)?.users.remove(&id).is_some())
    }

    async fn count_users_with_role(&self, role_id: RoleId) -> Result<u64, StoreError> {
        Ok(read(&self.inner)?
            .users
            .values()
            .filter(|u| u.role_id == role_id)
            .count() as u64)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Permission metadata
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PermissionState {
    last_role: i64,
    roles: BTreeMap<RoleId, Role>,
    last_resource: i64,
    resources: BTreeMap<ResourceId, ResourceMeta>,
    last_field: i64,
    fields: BTreeMap<FieldId, FieldMeta>,
    table_grants: BTreeMap<(RoleId, ResourceId), TableGrant>,
    field_grants: BTreeMap<(RoleId, FieldId), FieldGrant>,
}

/// In-memory permission metadata.
///
/// `set_offline(true)` makes every call fail with `StoreError::Unavailable`,
/// which lets tests exercise fail-closed paths.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    inner: RwLock<PermissionState>,
    offline: AtomicBool,
}

impl InMemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn state(&self) -> Result<RwLockReadGuard<'_, PermissionState>, StoreError> {
        self.ensure_online()?;
        read(&self.inner)
    }

    fn state_mut(&self) -> Result<RwLockWriteGuard<'_, PermissionState>, StoreError> {
        self.ensure_online()?;
        write(&self.inner)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("permission store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        Ok(self.state()?.roles.values().cloned().collect())
    }

    async fn role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        Ok(self.state()?.roles.get(&id).cloned())
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        Ok(self.state()?.roles.values().find(|r| r.name == name).cloned())
    }

    async fn insert_role(&self, name: &str) -> Result<Role, StoreError> {
        let mut state = self.state_mut()?;
        if state.roles.values().any(|r| r.name == name) {
            return Err(StoreError::UniqueViolation(format!("role '{name}' already exists")));
        }
        state.last_role += 1;
        let role = Role::new(RoleId::new(state.last_role), name);
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        let mut state = self.state_mut()?;
        if state.roles.remove(&id).is_none() {
            return Ok(false);
        }
        state.table_grants.retain(|(role, _), _| *role != id);
        state.field_grants.retain(|(role, _), _| *role != id);
        Ok(true)
    }

    async fn upsert_resource(&self, name: &str, display_name: &str) -> Result<ResourceMeta, StoreError> {
        let mut state = self.state_mut()?;
        if let Some(existing) = state.resources.values_mut().find(|r| r.name == name) {
            existing.display_name = display_name.to_string();
            return Ok(existing.clone());
        }
        state.last_resource += 1;
        let meta = ResourceMeta {
            id: ResourceId::new(state.last_resource),
            name: name.to_string(),
            display_name: display_name.to_string(),
        };
        state.resources.insert(meta.id, meta.clone());
        Ok(meta)
    }

    async fn list_resources(&self) -> Result<Vec<ResourceMeta>, StoreError> {
        Ok(self.state()?.resources.values().cloned().collect())
    }

    async fn resource_by_name(&self, name: &str) -> Result<Option<ResourceMeta>, StoreError> {
        Ok(self.state()?.resources.values().find(|r| r.name == name).cloned())
    }

    async fn upsert_field(
        &self,
        resource_id: ResourceId,
        field_name: &str,
        data_type: DataType,
        is_sensitive: bool,
    ) -> Result<FieldMeta, StoreError> {
        let mut state = self.state_mut()?;
        if !state.resources.contains_key(&resource_id) {
            return Err(StoreError::ForeignKeyViolation(format!("resource {resource_id} does not exist")));
        }
        if let Some(existing) = state
            .fields
            .values_mut()
            .find(|f| f.resource_id == resource_id && f.field_name == field_name)
        {
            existing.data_type = data_type;
            existing.is_sensitive = is_sensitive;
            return Ok(existing.clone());
        }
        state.last_field += 1;
        let meta = FieldMeta {
            id: FieldId::new(state.last_field),
            resource_id,
            field_name: field_name.to_string(),
            data_type,
            is_sensitive,
        };
        state.fields.insert(meta.id, meta.clone());
        Ok(meta)
    }

    async fn fields_of(&self, resource_id: ResourceId) -> Result<Vec<FieldMeta>, StoreError> {
        Ok(self
            .state()?
            .fields
            .values()
            .filter(|f| f.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn table_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<TableGrant>, StoreError> {
        Ok(self.state()?.table_grants.get(&(role_id, resource_id)).copied())
    }

    async fn table_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(ResourceId, TableGrant)>, StoreError> {
        Ok(self
            .state()?
            .table_grants
            .iter()
            .filter(|((role, _), _)| *role == role_id)
            .map(|((_, resource), grant)| (*resource, *grant))
            .collect())
    }

    async fn upsert_table_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        grant: TableGrant,
    ) -> Result<(), StoreError> {
        self.state_mut()?.table_grants.insert((role_id, resource_id), grant);
        Ok(())
    }

    async fn set_table_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action: Action,
        allowed: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state_mut()?;
        let row = state.table_grants.entry((role_id, resource_id)).or_default();
        *row = row.with(action, allowed);
        Ok(())
    }

    async fn field_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(FieldId, FieldGrant)>, StoreError> {
        Ok(self
            .state()?
            .field_grants
            .iter()
            .filter(|((role, _), _)| *role == role_id)
            .map(|((_, field), grant)| (*field, *grant))
            .collect())
    }

    async fn upsert_field_grant(&self, role_id: RoleId, field_id: FieldId, grant: FieldGrant) -> Result<(), StoreError> {
        self.state_mut()?.field_grants.insert((role_id, field_id), grant);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Business records
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<RecordId, FieldValues>,
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_null(resource: &ResourceDef, columns: Vec<String>) -> Result<(), StoreError> {
    match columns.first() {
        Some(column) => Err(StoreError::NotNullViolation(format!("{}.{}", resource.name, column))),
        None => Ok(()),
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(&self, resource: &'static ResourceDef, columns: &[&'static str]) -> Result<Vec<Record>, StoreError> {
        let tables = read(&self.tables)?;
        let Some(table) = tables.get(resource.name) else {
            return Ok(Vec::new());
        };

        Ok(table
            .rows
            .iter()
            .map(|(id, row)| {
                let mut values = FieldValues::new();
                for &column in columns {
                    let value = row.get(column).cloned().unwrap_or(FieldValue::Null);
                    values.insert(column, value);
                }
                Record { id: *id, values }
            })
            .collect())
    }

    async fn insert(&self, resource: &'static ResourceDef, values: &FieldValues) -> Result<RecordId, StoreError> {
        not_null(resource, values.missing_required(resource))?;
        let mut tables = write(&self.tables)?;
        let table = tables.entry(resource.name).or_default();
        table.last_id += 1;
        let id = RecordId::new(table.last_id);
        table.rows.insert(id, values.clone());
        Ok(id)
    }

    async fn update(&self, resource: &'static ResourceDef, id: RecordId, values: &FieldValues) -> Result<bool, StoreError> {
        not_null(resource, values.nulled_required(resource))?;
        let mut tables = write(&self.tables)?;
        let Some(row) = tables.get_mut(resource.name).and_then(|t| t.rows.get_mut(&id)) else {
            return Ok(false);
        };
        row.merge(values);
        Ok(true)
    }

    async fn delete(&self, resource: &'static ResourceDef, id: RecordId) -> Result<bool, StoreError> {
        let mut tables = write(&self.tables)?;
        Ok(tables
            .get_mut(resource.name)
            .is_some_and(|t| t.rows.remove(&id).is_some()))
    }
}
