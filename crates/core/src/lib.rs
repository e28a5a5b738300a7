//! `fieldgate-core`: identifiers and the error taxonomy shared by every crate.
//!
//! This crate has no IO and no framework dependencies.

pub mod error;
pub mod id;

pub use error::{AppError, AppResult, ErrorKind};
pub use id::{FieldId, RecordId, ResourceId, RoleId, UserId};
