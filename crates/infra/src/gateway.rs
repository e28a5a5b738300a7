//! Generic Resource Gateway.
//!
//! Dynamic CRUD over the business tables of the catalog. Each operation
//! resolves the resource, runs the table gate, then the field gate, and only
//! then touches the record store. Check-and-act is not transactional.

use std::sync::Arc;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, instrument};

use fieldgate_auth::{Action, FieldAccess};
use fieldgate_core::{AppError, AppResult, RecordId, RoleId};

use crate::catalog::{self, ResourceDef};
use crate::evaluator::AccessEvaluator;
use crate::record::{FieldValues, Record};
use crate::store::RecordStore;

pub struct ResourceGateway {
    evaluator: Arc<AccessEvaluator>,
    records: Arc<dyn RecordStore>,
}

impl ResourceGateway {
    pub fn new(evaluator: Arc<AccessEvaluator>, records: Arc<dyn RecordStore>) -> Self {
        Self { evaluator, records }
    }

    /// Unknown names are rejected before any permission is consulted.
    fn resolve(resource: &str) -> AppResult<&'static ResourceDef> {
        catalog::business(resource).ok_or_else(|| AppError::not_found(format!("unknown resource '{resource}'")))
    }

    async fn authorize(&self, role_id: RoleId, resource: &'static ResourceDef, action: Action) -> AppResult<()> {
        if self.evaluator.can_access_table(role_id, resource.name, action).await {
            Ok(())
        } else {
            Err(AppError::authorization(format!("no {action} permission on {}", resource.name)))
        }
    }

    #[instrument(skip(self), fields(%role_id), err(level = "debug"))]
    pub async fn list(&self, resource: &str, role_id: RoleId) -> AppResult<Vec<Record>> {
        let def = Self::resolve(resource)?;
        self.authorize(role_id, def, Action::Read).await?;

        let access = self.evaluator.allowed_fields(role_id, def.name).await;
        let columns: Vec<&'static str> = def
            .fields
            .iter()
            .map(|f| f.name)
            .filter(|name| access.can_view(name))
            .collect();

        Ok(self.records.list(def, &columns).await?)
    }

    #[instrument(skip(self, payload), fields(%role_id), err(level = "debug"))]
    pub async fn create(
        &self,
        resource: &str,
        role_id: RoleId,
        payload: &JsonMap<String, JsonValue>,
    ) -> AppResult<RecordId> {
        let def = Self::resolve(resource)?;
        self.authorize(role_id, def, Action::Create).await?;

        let values = self.filtered(def, role_id, payload).await?;
        let missing = values.missing_required(def);
        if !missing.is_empty() {
            return Err(AppError::MissingFields(missing));
        }

        Ok(self.records.insert(def, &values).await?)
    }

    /// Empty after filtering ⇒ success without touching the store.
    #[instrument(skip(self, payload), fields(%role_id), err(level = "debug"))]
    pub async fn update(
        &self,
        resource: &str,
        role_id: RoleId,
        id: RecordId,
        payload: &JsonMap<String, JsonValue>,
    ) -> AppResult<()> {
        let def = Self::resolve(resource)?;
        self.authorize(role_id, def, Action::Update).await?;

        let values = self.filtered(def, role_id, payload).await?;
        if values.is_empty() {
            debug!("nothing editable in payload; update skipped");
            return Ok(());
        }
        let nulled = values.nulled_required(def);
        if !nulled.is_empty() {
            return Err(AppError::validation(format!("required fields cannot be null: {}", nulled.join(", "))));
        }

        if self.records.update(def, id, &values).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("{} record {id} not found", def.name)))
        }
    }

    #[instrument(skip(self), fields(%role_id), err(level = "debug"))]
    pub async fn delete(&self, resource: &str, role_id: RoleId, id: RecordId) -> AppResult<()> {
        let def = Self::resolve(resource)?;
        self.authorize(role_id, def, Action::Delete).await?;

        if self.records.delete(def, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("{} record {id} not found", def.name)))
        }
    }

    async fn filtered(
        &self,
        def: &'static ResourceDef,
        role_id: RoleId,
        payload: &JsonMap<String, JsonValue>,
    ) -> AppResult<FieldValues> {
        let access: FieldAccess = self.evaluator.allowed_fields(role_id, def.name).await;
        let values = FieldValues::from_payload(def, payload, &access)?;
        if values.len() < payload.len() {
            debug!(kept = values.len(), received = payload.len(), "payload keys dropped by field gate");
        }
        Ok(values)
    }
}
