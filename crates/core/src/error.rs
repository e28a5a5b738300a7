//! Application error taxonomy.
//!
//! Every failure that can reach a caller is classified into one of these
//! variants before it leaves a service. The HTTP layer maps [`ErrorKind`]
//! to a status code; nothing below it knows about transport.

use thiserror::Error;

/// Result type used across services.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    Store,
}

impl ErrorKind {
    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Authentication => "unauthenticated",
            ErrorKind::Authorization => "forbidden",
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store_error",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Bad credentials, or a missing/invalid/expired bearer token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Table or field gate denial.
    #[error("access denied: {0}")]
    Authorization(String),

    /// Malformed input (invalid action, bad value type, blank name, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Required fields absent after payload filtering.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// Unknown token, role, resource, field, user or record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate registration, role still referenced, protected row.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The relational store is unreachable or a query failed.
    #[error("store error: {0}")]
    Store(String),
}

impl AppError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Authentication(_) => ErrorKind::Authentication,
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::Validation(_) | AppError::MissingFields(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Store(_) => ErrorKind::Store,
        }
    }
}
