//! `fieldgate-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod invitation;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{explain_table_decision, field_access, table_decision};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use invitation::{InvitationLinks, generate_invitation_token};
pub use password::{Argon2Hasher, HashError, SecretHasher};
pub use permissions::{Action, FieldAccess, FieldGrant, TableGrant};
pub use principal::Principal;
pub use roles::{DEFAULT_ROLE_NAME, Role, SUPERADMIN_ROLE_NAME};
pub use token::{Hs256TokenCodec, TokenCodec, TokenError};
pub use user::{NewUser, User, UserStatus, UserSummary};
