use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::instrument;

use fieldgate_core::RecordId;

use super::{map_sqlx_error, quote_ident};
use crate::catalog::{DataType, ResourceDef};
use crate::record::{FieldValue, FieldValues, Record};
use crate::store::{RecordStore, StoreError};

/// Dynamic CRUD over the business tables.
///
/// SQL text is assembled only from catalog identifiers; every value travels
/// as a bind parameter.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    resource: &'static ResourceDef,
    column: &'static str,
    value: &FieldValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        FieldValue::Text(s) => query.bind(s.clone()),
        FieldValue::Number(n) => query.bind(*n),
        // NULL must still carry the column's type.
        FieldValue::Null => match resource.field(column).map(|f| f.data_type) {
            Some(DataType::Number) => query.bind(None::<i64>),
            _ => query.bind(None::<String>),
        },
    }
}

fn record_from_row(
    row: &PgRow,
    resource: &'static ResourceDef,
    columns: &[&'static str],
) -> Result<Record, StoreError> {
    let decode = |e: sqlx::Error| StoreError::Decode(format!("{} row: {}", resource.name, e));
    let id: i64 = row.try_get("id").map_err(decode)?;

    let mut values = FieldValues::new();
    for &column in columns {
        let data_type = resource.field(column).map(|f| f.data_type).unwrap_or(DataType::Text);
        let value = match data_type {
            DataType::Text => row
                .try_get::<Option<String>, _>(column)
                .map_err(decode)?
                .map_or(FieldValue::Null, FieldValue::Text),
            DataType::Number => row
                .try_get::<Option<i64>, _>(column)
                .map_err(decode)?
                .map_or(FieldValue::Null, FieldValue::Number),
        };
        values.insert(column, value);
    }
    Ok(Record { id: RecordId::new(id), values })
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self, resource), fields(resource = resource.name), err)]
    async fn list(&self, resource: &'static ResourceDef, columns: &[&'static str]) -> Result<Vec<Record>, StoreError> {
        let mut select = vec!["id".to_string()];
        select.extend(columns.iter().map(|&c| quote_ident(c)));
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id ASC",
            select.join(", "),
            quote_ident(resource.name)
        );

        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_records", e))?;

        rows.iter()
            .map(|row| record_from_row(row, resource, columns))
            .collect()
    }

    #[instrument(skip(self, resource, values), fields(resource = resource.name), err)]
    async fn insert(&self, resource: &'static ResourceDef, values: &FieldValues) -> Result<RecordId, StoreError> {
        let table = quote_ident(resource.name);
        let sql = if values.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING id")
        } else {
            let columns: Vec<String> = values.iter().map(|(c, _)| quote_ident(c)).collect();
            let params: Vec<String> = (1..=values.len()).map(|i| format!("${i}")).collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({}) RETURNING id",
                columns.join(", "),
                params.join(", ")
            )
        };

        let mut query = sqlx::query(&sql);
        for (column, value) in values.iter() {
            query = bind_value(query, resource, column, value);
        }

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_record", e))?;
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::Decode(format!("{} insert returned no id: {}", resource.name, e)))?;
        Ok(RecordId::new(id))
    }

    #[instrument(skip(self, resource, values), fields(resource = resource.name), err)]
    async fn update(&self, resource: &'static ResourceDef, id: RecordId, values: &FieldValues) -> Result<bool, StoreError> {
        let assignments: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", quote_ident(column), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            quote_ident(resource.name),
            assignments.join(", "),
            values.len() + 1
        );

        let mut query = sqlx::query(&sql);
        for (column, value) in values.iter() {
            query = bind_value(query, resource, column, value);
        }
        let result = query
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_record", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, resource), fields(resource = resource.name), err)]
    async fn delete(&self, resource: &'static ResourceDef, id: RecordId) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", quote_ident(resource.name));
        let result = sqlx::query(&sql)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_record", e))?;
        Ok(result.rows_affected() > 0)
    }
}
