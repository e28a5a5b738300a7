use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod data;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/permissions", get(auth::my_permissions))
        .route("/auth/field-permissions", get(auth::my_field_permissions))
        .nest("/admin", admin::router())
        .nest("/data", data::router())
}
