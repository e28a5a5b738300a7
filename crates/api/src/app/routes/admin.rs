//! Admin routes: roles, table and field grants, users.
//!
//! Role and grant endpoints need the Admin role; user endpoints additionally
//! need the caller's superadmin flag. Both checks live in `AdminService`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde_json::json;

use fieldgate_auth::FieldGrant;
use fieldgate_core::{AppError, RoleId};

use crate::app::{dto, errors, services::AppServices};
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/:id", delete(delete_role))
        .route(
            "/permissions",
            get(list_permissions).post(grant_permission).delete(revoke_permission),
        )
        .route("/permissions/:role_id", get(list_permissions_for))
        .route("/field-permissions", get(list_field_permissions).post(set_field_permission))
        .route("/field-permissions/:role_id", get(list_field_permissions_for))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id/role", put(update_user_role))
        .route("/users/:id", delete(delete_user))
}

macro_rules! try_response {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(res) => return res,
        }
    };
}

fn message(text: &str) -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "message": text }))).into_response()
}

fn required_role_id(query: dto::RoleQuery) -> Result<RoleId, axum::response::Response> {
    query
        .role_id
        .ok_or_else(|| errors::app_error_to_response(AppError::validation("role_id is required")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.list_roles(principal.principal()).await {
        Ok(roles) => (StatusCode::OK, Json(roles)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /admin/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = try_response!(dto::body(payload));
    match services.admin.create_role(principal.principal(), &body.name).await {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// DELETE /admin/roles/:id
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let role_id = try_response!(dto::parse_role_id(&id));
    match services.admin.delete_role(principal.principal(), role_id).await {
        Ok(()) => message("Role deleted"),
        Err(e) => errors::app_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table grants
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/permissions?role_id=
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    params: Result<Query<dto::RoleQuery>, QueryRejection>,
) -> axum::response::Response {
    let role_id = try_response!(dto::query(params).and_then(required_role_id));
    permissions_response(&services, &principal, role_id).await
}

/// GET /admin/permissions/:role_id
pub async fn list_permissions_for(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(role_id): Path<String>,
) -> axum::response::Response {
    let role_id = try_response!(dto::parse_role_id(&role_id));
    permissions_response(&services, &principal, role_id).await
}

async fn permissions_response(
    services: &AppServices,
    principal: &PrincipalContext,
    role_id: RoleId,
) -> axum::response::Response {
    match services.admin.permissions(principal.principal(), role_id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /admin/permissions
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::TablePermissionRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = try_response!(dto::body(payload));
    match services
        .admin
        .grant(principal.principal(), body.role_id, &body.resource, &body.action)
        .await
    {
        Ok(()) => message("Permission granted"),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// DELETE /admin/permissions
pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::TablePermissionRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = try_response!(dto::body(payload));
    match services
        .admin
        .revoke(principal.principal(), body.role_id, &body.resource, &body.action)
        .await
    {
        Ok(()) => message("Permission revoked"),
        Err(e) => errors::app_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field grants
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/field-permissions?role_id=
pub async fn list_field_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    params: Result<Query<dto::RoleQuery>, QueryRejection>,
) -> axum::response::Response {
    let role_id = try_response!(dto::query(params).and_then(required_role_id));
    field_permissions_response(&services, &principal, role_id).await
}

/// GET /admin/field-permissions/:role_id
pub async fn list_field_permissions_for(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(role_id): Path<String>,
) -> axum::response::Response {
    let role_id = try_response!(dto::parse_role_id(&role_id));
    field_permissions_response(&services, &principal, role_id).await
}

async fn field_permissions_response(
    services: &AppServices,
    principal: &PrincipalContext,
    role_id: RoleId,
) -> axum::response::Response {
    match services.admin.field_permissions(principal.principal(), role_id).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /admin/field-permissions
pub async fn set_field_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::FieldPermissionRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = try_response!(dto::body(payload));
    let grant = FieldGrant {
        can_view: body.can_view,
        can_edit: body.can_edit,
    };
    match services
        .admin
        .set_field_permission(principal.principal(), body.role_id, &body.resource, &body.field, grant)
        .await
    {
        Ok(()) => message("Field permission updated"),
        Err(e) => errors::app_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// GET /admin/users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.admin.list_users(principal.principal()).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// POST /admin/users
///
/// With a password the account is created Active; without one an invitation
/// is issued and its links are returned.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateUserRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = services.admin.require_superadmin_user(principal.principal()).await {
        return errors::app_error_to_response(e);
    }
    let body = try_response!(dto::body(payload));

    match body.password.as_deref() {
        Some(password) => {
            let username = body.username.as_deref().unwrap_or(&body.email);
            match services
                .invitations
                .create_user(username, Some(&body.email), password, body.role_id)
                .await
            {
                Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
                Err(e) => errors::app_error_to_response(e),
            }
        }
        None => match services.invitations.invite(&body.email, body.role_id).await {
            Ok(outcome) => (StatusCode::CREATED, Json(outcome)).into_response(),
            Err(e) => errors::app_error_to_response(e),
        },
    }
}

/// PUT /admin/users/:id/role
pub async fn update_user_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateUserRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    let user_id = try_response!(dto::parse_user_id(&id));
    let body = try_response!(dto::body(payload));
    match services
        .admin
        .update_user_role(principal.principal(), user_id, body.role_id)
        .await
    {
        Ok(_) => message("Role updated"),
        Err(e) => errors::app_error_to_response(e),
    }
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id = try_response!(dto::parse_user_id(&id));
    match services.admin.delete_user(principal.principal(), user_id).await {
        Ok(()) => message("User deleted"),
        Err(e) => errors::app_error_to_response(e),
    }
}
