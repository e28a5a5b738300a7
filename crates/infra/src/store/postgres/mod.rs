//! Postgres-backed stores.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (foreign key violation) | `23503` | `ForeignKeyViolation` |
//! | Database (not-null violation) | `23502` | `NotNullViolation` |
//! | Database (other) | Any other | `Query` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | ColumnDecode / Decode / ColumnNotFound | N/A | `Decode` |
//! | Other | N/A | `Query` |
//!
//! ## Thread Safety
//!
//! Every store wraps a shared `PgPool`, which is `Send + Sync` and handles
//! connection management. No statement spans more than one call; there are
//! no cross-statement transactions.

use super::StoreError;

mod credentials;
mod permissions;
mod records;
mod schema;

pub use credentials::PostgresCredentialStore;
pub use permissions::PostgresPermissionStore;
pub use records::PostgresRecordStore;
pub use schema::ensure_schema;

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} failed: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                Some("23502") => StoreError::NotNullViolation(msg),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {}: {}", operation, e)),
        sqlx::Error::Tls(e) => StoreError::Unavailable(format!("tls error in {}: {}", operation, e)),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{} returned an unreadable row: {}", operation, err))
        }
        _ => StoreError::Query(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Double-quote a catalog identifier.
///
/// Only catalog `&'static str` names (lowercase ASCII and `_`) reach here.
pub(crate) fn quote_ident(name: &'static str) -> String {
    format!("\"{}\"", name)
}
