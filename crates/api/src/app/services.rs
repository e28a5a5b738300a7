//! Service wiring: picks the store backend and assembles every service over it.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use fieldgate_auth::{Argon2Hasher, Hs256TokenCodec, SecretHasher, TokenCodec};
use fieldgate_infra::notify::{Notifier, TracingNotifier};
use fieldgate_infra::store::postgres::{
    PostgresCredentialStore, PostgresPermissionStore, PostgresRecordStore, ensure_schema,
};
use fieldgate_infra::store::{
    CredentialStore, InMemoryCredentialStore, InMemoryPermissionStore, InMemoryRecordStore, PermissionStore,
    RecordStore,
};
use fieldgate_infra::{AccessEvaluator, AdminService, InvitationManager, ResourceGateway, SessionIssuer, seed};

use crate::config::Settings;

/// The three store capabilities, however they are backed.
#[derive(Clone)]
pub struct Stores {
    pub credentials: Arc<dyn CredentialStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub records: Arc<dyn RecordStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            credentials: Arc::new(InMemoryCredentialStore::new()),
            permissions: Arc::new(InMemoryPermissionStore::new()),
            records: Arc::new(InMemoryRecordStore::new()),
        }
    }

    /// Connect, then create any missing table.
    pub async fn postgres(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("failed to connect to DATABASE_URL")?;
        ensure_schema(&pool).await.context("failed to create schema")?;

        Ok(Self {
            credentials: Arc::new(PostgresCredentialStore::new(pool.clone())),
            permissions: Arc::new(PostgresPermissionStore::new(pool.clone())),
            records: Arc::new(PostgresRecordStore::new(pool)),
        })
    }
}

pub struct AppServices {
    pub sessions: Arc<SessionIssuer>,
    pub invitations: InvitationManager,
    pub admin: AdminService,
    pub gateway: ResourceGateway,
}

impl AppServices {
    pub fn new(stores: Stores, codec: Arc<dyn TokenCodec>, notifier: Arc<dyn Notifier>, app_base_url: &str) -> Self {
        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2Hasher);
        let evaluator = Arc::new(AccessEvaluator::new(stores.permissions.clone()));

        Self {
            sessions: Arc::new(SessionIssuer::new(stores.credentials.clone(), hasher.clone(), codec)),
            invitations: InvitationManager::new(
                stores.credentials.clone(),
                stores.permissions.clone(),
                hasher,
                notifier,
                app_base_url,
            ),
            admin: AdminService::new(evaluator.clone(), stores.credentials, stores.permissions),
            gateway: ResourceGateway::new(evaluator, stores.records),
        }
    }
}

/// Build the services described by `settings`, seeding the store on first start.
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let stores = match settings.database_url.as_deref() {
        Some(url) => {
            tracing::info!("using postgres stores");
            Stores::postgres(url, settings.database_max_connections).await?
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            Stores::in_memory()
        }
    };

    let outcome = seed(
        stores.credentials.as_ref(),
        stores.permissions.as_ref(),
        &Argon2Hasher,
        &settings.bootstrap_admin_password,
    )
    .await
    .context("bootstrap seeding failed")?;
    tracing::info!(?outcome, "bootstrap finished");

    let codec: Arc<dyn TokenCodec> = Arc::new(Hs256TokenCodec::new(settings.jwt_secret.as_bytes()));
    Ok(AppServices::new(
        stores,
        codec,
        Arc::new(TracingNotifier),
        &settings.app_base_url,
    ))
}
