//! Login, invitation acceptance/decline, and the caller's own grants.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/set-password", post(set_password))
        .route("/auth/decline-invitation", post(decline_invitation))
}

/// POST /auth/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.sessions.login(&body.username, &body.password).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /auth/set-password
pub async fn set_password(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::SetPasswordRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.invitations.set_password(&body.token, &body.password).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Password set successfully" }))).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /auth/decline-invitation
pub async fn decline_invitation(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<dto::DeclineInvitationRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match dto::body(payload) {
        Ok(b) => b,
        Err(res) => return res,
    };

    match services.invitations.decline(&body.token).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "message": "Invitation declined" }))).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// GET /auth/permissions
pub async fn my_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.my_permissions(principal.principal()).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// GET /auth/field-permissions
pub async fn my_field_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.my_field_permissions(principal.principal()).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}
