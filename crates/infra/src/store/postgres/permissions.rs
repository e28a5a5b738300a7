use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use fieldgate_auth::{Action, FieldGrant, Role, TableGrant};
use fieldgate_core::{FieldId, ResourceId, RoleId};

use super::map_sqlx_error;
use crate::catalog::DataType;
use crate::store::{FieldMeta, PermissionStore, ResourceMeta, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresPermissionStore {
    pool: PgPool,
}

impl PostgresPermissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_err(table: &str) -> impl Fn(sqlx::Error) -> StoreError + '_ {
    move |e| StoreError::Decode(format!("{} row: {}", table, e))
}

fn role_from_row(row: &PgRow) -> Result<Role, StoreError> {
    let decode = decode_err("roles");
    Ok(Role::new(
        RoleId::new(row.try_get("id").map_err(&decode)?),
        row.try_get::<String, _>("name").map_err(&decode)?,
    ))
}

fn resource_from_row(row: &PgRow) -> Result<ResourceMeta, StoreError> {
    let decode = decode_err("resources");
    Ok(ResourceMeta {
        id: ResourceId::new(row.try_get("id").map_err(&decode)?),
        name: row.try_get("name").map_err(&decode)?,
        display_name: row.try_get("display_name").map_err(&decode)?,
    })
}

fn field_from_row(row: &PgRow) -> Result<FieldMeta, StoreError> {
    let decode = decode_err("resource_fields");
    let data_type = match row.try_get::<String, _>("data_type").map_err(&decode)?.as_str() {
        "text" => DataType::Text,
        "number" => DataType::Number,
        other => return Err(StoreError::Decode(format!("resource_fields row has unknown data_type '{other}'"))),
    };
    Ok(FieldMeta {
        id: FieldId::new(row.try_get("id").map_err(&decode)?),
        resource_id: ResourceId::new(row.try_get("resource_id").map_err(&decode)?),
        field_name: row.try_get("field_name").map_err(&decode)?,
        data_type,
        is_sensitive: row.try_get("is_sensitive").map_err(&decode)?,
    })
}

fn table_grant_from_row(row: &PgRow) -> Result<TableGrant, StoreError> {
    let decode = decode_err("role_resource_permissions");
    Ok(TableGrant {
        can_view: row.try_get("can_view").map_err(&decode)?,
        can_create: row.try_get("can_create").map_err(&decode)?,
        can_update: row.try_get("can_update").map_err(&decode)?,
        can_delete: row.try_get("can_delete").map_err(&decode)?,
    })
}

/// Grant column backing each action.
fn action_column(action: Action) -> &'static str {
    match action {
        Action::Read => "can_view",
        Action::Create => "can_create",
        Action::Update => "can_update",
        Action::Delete => "can_delete",
    }
}

#[async_trait]
impl PermissionStore for PostgresPermissionStore {
    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn role_by_id(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_by_id", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_by_name", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn insert_role(&self, name: &str) -> Result<Role, StoreError> {
        let row = sqlx::query("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_role", e))?;
        role_from_row(&row)
    }

    /// Grant rows go with the role through `ON DELETE CASCADE`.
    #[instrument(skip(self), err)]
    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn upsert_resource(&self, name: &str, display_name: &str) -> Result<ResourceMeta, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO resources (name, display_name)
            VALUES ($1, $2)
            ON CONFLICT (name)
            DO UPDATE SET display_name = EXCLUDED.display_name
            RETURNING id, name, display_name
            "#,
        )
        .bind(name)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_resource", e))?;
        resource_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn list_resources(&self) -> Result<Vec<ResourceMeta>, StoreError> {
        let rows = sqlx::query("SELECT id, name, display_name FROM resources ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_resources", e))?;
        rows.iter().map(resource_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn resource_by_name(&self, name: &str) -> Result<Option<ResourceMeta>, StoreError> {
        let row = sqlx::query("SELECT id, name, display_name FROM resources WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("resource_by_name", e))?;
        row.as_ref().map(resource_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn upsert_field(
        &self,
        resource_id: ResourceId,
        field_name: &str,
        data_type: DataType,
        is_sensitive: bool,
    ) -> Result<FieldMeta, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO resource_fields (resource_id, field_name, data_type, is_sensitive)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (resource_id, field_name)
            DO UPDATE SET
                data_type = EXCLUDED.data_type,
                is_sensitive = EXCLUDED.is_sensitive
            RETURNING id, resource_id, field_name, data_type, is_sensitive
            "#,
        )
        .bind(resource_id.get())
        .bind(field_name)
        .bind(data_type.as_str())
        .bind(is_sensitive)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_field", e))?;
        field_from_row(&row)
    }

    #[instrument(skip(self), err)]
    async fn fields_of(&self, resource_id: ResourceId) -> Result<Vec<FieldMeta>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, resource_id, field_name, data_type, is_sensitive
            FROM resource_fields
            WHERE resource_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(resource_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fields_of", e))?;
        rows.iter().map(field_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn table_grant(&self, role_id: RoleId, resource_id: ResourceId) -> Result<Option<TableGrant>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT can_view, can_create, can_update, can_delete
            FROM role_resource_permissions
            WHERE role_id = $1 AND resource_id = $2
            "#,
        )
        .bind(role_id.get())
        .bind(resource_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("table_grant", e))?;
        row.as_ref().map(table_grant_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn table_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(ResourceId, TableGrant)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT resource_id, can_view, can_create, can_update, can_delete
            FROM role_resource_permissions
            WHERE role_id = $1
            ORDER BY resource_id ASC
            "#,
        )
        .bind(role_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("table_grants_for_role", e))?;

        rows.iter()
            .map(|row| {
                let resource_id: i64 = row
                    .try_get("resource_id")
                    .map_err(decode_err("role_resource_permissions"))?;
                Ok((ResourceId::new(resource_id), table_grant_from_row(row)?))
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn upsert_table_grant(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        grant: TableGrant,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO role_resource_permissions (role_id, resource_id, can_view, can_create, can_update, can_delete)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (role_id, resource_id)
            DO UPDATE SET
                can_view = EXCLUDED.can_view,
                can_create = EXCLUDED.can_create,
                can_update = EXCLUDED.can_update,
                can_delete = EXCLUDED.can_delete
            "#,
        )
        .bind(role_id.get())
        .bind(resource_id.get())
        .bind(grant.can_view)
        .bind(grant.can_create)
        .bind(grant.can_update)
        .bind(grant.can_delete)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_table_grant", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn set_table_permission(
        &self,
        role_id: RoleId,
        resource_id: ResourceId,
        action: Action,
        allowed: bool,
    ) -> Result<(), StoreError> {
        let column = action_column(action);
        let sql = format!(
            r#"
            INSERT INTO role_resource_permissions (role_id, resource_id, {column})
            VALUES ($1, $2, $3)
            ON CONFLICT (role_id, resource_id)
            DO UPDATE SET {column} = EXCLUDED.{column}
            "#
        );
        sqlx::query(&sql)
            .bind(role_id.get())
            .bind(resource_id.get())
            .bind(allowed)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_table_permission", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn field_grants_for_role(&self, role_id: RoleId) -> Result<Vec<(FieldId, FieldGrant)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT resource_field_id, can_view, can_edit
            FROM role_field_permissions
            WHERE role_id = $1
            ORDER BY resource_field_id ASC
            "#,
        )
        .bind(role_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("field_grants_for_role", e))?;

        let decode = decode_err("role_field_permissions");
        rows.iter()
            .map(|row| {
                let field_id: i64 = row.try_get("resource_field_id").map_err(&decode)?;
                let grant = FieldGrant {
                    can_view: row.try_get("can_view").map_err(&decode)?,
                    can_edit: row.try_get("can_edit").map_err(&decode)?,
                };
                Ok((FieldId::new(field_id), grant))
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn upsert_field_grant(&self, role_id: RoleId, field_id: FieldId, grant: FieldGrant) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO role_field_permissions (role_id, resource_field_id, can_view, can_edit)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (role_id, resource_field_id)
            DO UPDATE SET
                can_view = EXCLUDED.can_view,
                can_edit = EXCLUDED.can_edit
            "#,
        )
        .bind(role_id.get())
        .bind(field_id.get())
        .bind(grant.can_view)
        .bind(grant.can_edit)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_field_grant", e))?;
        Ok(())
    }
}
