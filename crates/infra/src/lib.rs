//! Infrastructure layer: stores, the resource catalog and the services that
//! sit on top of them.
//!
//! Everything above the store traits is storage-agnostic; the API crate
//! chooses in-memory or Postgres stores at startup.

pub mod admin;
pub mod bootstrap;
pub mod catalog;
pub mod evaluator;
pub mod gateway;
pub mod invitations;
pub mod notify;
pub mod record;
pub mod sessions;
pub mod store;

pub use admin::{AdminService, FieldPermissionEntry, PermissionEntry};
pub use bootstrap::{SeedOutcome, seed};
pub use evaluator::AccessEvaluator;
pub use gateway::ResourceGateway;
pub use invitations::{InvitationManager, InvitationOutcome};
pub use notify::{Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use record::{FieldValue, FieldValues, Record};
pub use sessions::{Session, SessionIssuer, SessionUser};
pub use store::{CredentialStore, PermissionStore, RecordStore, StoreError};
