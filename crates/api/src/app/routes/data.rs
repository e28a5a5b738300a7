//! Generic CRUD over the business resources, through the resource gateway.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::{Map as JsonMap, Value as JsonValue, json};

use fieldgate_core::RecordId;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/:resource", get(list_records).post(create_record))
        .route("/:resource/:id", put(update_record).delete(delete_record))
}

fn parse_record_id(raw: &str) -> Result<RecordId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("invalid record id '{raw}'"))
    })
}

/// GET /data/:resource
pub async fn list_records(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(resource): Path<String>,
) -> axum::response::Response {
    match services.gateway.list(&resource, principal.role_id()).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /data/:resource
pub async fn create_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(resource): Path<String>,
    payload: Result<Json<JsonMap<String, JsonValue>>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.gateway.create(&resource, principal.role_id(), &body).await {
        Ok(id) => (StatusCode::CREATED, Json(json!({ "id": id }))).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// PUT /data/:resource/:id
pub async fn update_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((resource, id)): Path<(String, String)>,
    payload: Result<Json<JsonMap<String, JsonValue>>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.gateway.update(&resource, principal.role_id(), id, &body).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Record updated" }))).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// DELETE /data/:resource/:id
pub async fn delete_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((resource, id)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match parse_record_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    match services.gateway.delete(&resource, principal.role_id(), id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Record deleted" }))).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}
