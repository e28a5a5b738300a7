use sqlx::PgPool;
use tracing::instrument;

use super::{map_sqlx_error, quote_ident};
use crate::catalog::{self, ResourceDef};
use crate::store::StoreError;

const METADATA_DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        role_id BIGINT NOT NULL REFERENCES roles(id),
        email TEXT,
        invitation_token TEXT UNIQUE,
        status TEXT NOT NULL DEFAULT 'Pending',
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resources (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resource_fields (
        id BIGSERIAL PRIMARY KEY,
        resource_id BIGINT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
        field_name TEXT NOT NULL,
        data_type TEXT NOT NULL,
        is_sensitive BOOLEAN NOT NULL DEFAULT FALSE,
        UNIQUE (resource_id, field_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_resource_permissions (
        role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        resource_id BIGINT NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
        can_view BOOLEAN NOT NULL DEFAULT FALSE,
        can_create BOOLEAN NOT NULL DEFAULT FALSE,
        can_update BOOLEAN NOT NULL DEFAULT FALSE,
        can_delete BOOLEAN NOT NULL DEFAULT FALSE,
        PRIMARY KEY (role_id, resource_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS role_field_permissions (
        role_id BIGINT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
        resource_field_id BIGINT NOT NULL REFERENCES resource_fields(id) ON DELETE CASCADE,
        can_view BOOLEAN NOT NULL DEFAULT FALSE,
        can_edit BOOLEAN NOT NULL DEFAULT FALSE,
        PRIMARY KEY (role_id, resource_field_id)
    )
    "#,
];

/// `CREATE TABLE IF NOT EXISTS` for one business resource.
pub(crate) fn business_table_ddl(resource: &'static ResourceDef) -> String {
    let mut columns = vec!["id BIGSERIAL PRIMARY KEY".to_string()];
    for field in resource.fields {
        let not_null = if field.required { " NOT NULL" } else { "" };
        columns.push(format!("{} {}{}", quote_ident(field.name), field.data_type.sql_type(), not_null));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(resource.name),
        columns.join(", ")
    )
}

/// Create metadata and business tables if they do not exist yet.
#[instrument(skip(pool), err)]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for ddl in METADATA_DDL {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    for resource in catalog::business_resources() {
        sqlx::query(&business_table_ddl(resource))
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}
