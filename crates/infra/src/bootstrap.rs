//! First-start seeding of roles, the superadmin account and the catalog.

use tracing::{info, instrument};

use fieldgate_auth::{DEFAULT_ROLE_NAME, FieldGrant, NewUser, SUPERADMIN_ROLE_NAME, SecretHasher, TableGrant};
use fieldgate_core::{AppError, AppResult};

use crate::catalog::CATALOG;
use crate::store::{CredentialStore, PermissionStore};

/// Username of the seeded superadmin.
pub const SUPERADMIN_USERNAME: &str = "admin";

/// What `seed` found or created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    AlreadySeeded,
    Seeded,
}

/// Seed an empty store. A store that already has an "Admin" role is left
/// untouched. Each write is an upsert; the sequence as a whole is not atomic.
#[instrument(skip_all, err)]
pub async fn seed(
    credentials: &dyn CredentialStore,
    permissions: &dyn PermissionStore,
    hasher: &dyn SecretHasher,
    admin_password: &str,
) -> AppResult<SeedOutcome> {
    if permissions.role_by_name(SUPERADMIN_ROLE_NAME).await?.is_some() {
        info!("store already seeded");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let admin_role = permissions.insert_role(SUPERADMIN_ROLE_NAME).await?;

    if credentials.user_by_username(SUPERADMIN_USERNAME).await?.is_none() {
        let digest = hasher
            .hash(admin_password)
            .map_err(|e| AppError::store(e.to_string()))?;
        let mut admin = NewUser::active(SUPERADMIN_USERNAME, None, digest, admin_role.id);
        admin.is_admin = true;
        credentials.insert_user(admin).await?;
    }

    if permissions.role_by_name(DEFAULT_ROLE_NAME).await?.is_none() {
        permissions.insert_role(DEFAULT_ROLE_NAME).await?;
    }

    for def in CATALOG {
        let resource = permissions.upsert_resource(def.name, def.display_name).await?;
        permissions
            .upsert_table_grant(admin_role.id, resource.id, TableGrant::FULL)
            .await?;
        for field in def.fields {
            let meta = permissions
                .upsert_field(resource.id, field.name, field.data_type, field.sensitive)
                .await?;
            permissions
                .upsert_field_grant(admin_role.id, meta.id, FieldGrant::FULL)
                .await?;
        }
    }

    info!(resources = CATALOG.len(), "store seeded");
    Ok(SeedOutcome::Seeded)
}
