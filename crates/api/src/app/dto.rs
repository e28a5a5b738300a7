use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Query};
use axum::http::StatusCode;
use serde::Deserialize;

use fieldgate_core::{RoleId, UserId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeclineInvitationRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role_id: Option<RoleId>,
}

#[derive(Debug, Deserialize)]
pub struct TablePermissionRequest {
    pub role_id: RoleId,
    pub resource: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct FieldPermissionRequest {
    pub role_id: RoleId,
    pub resource: String,
    pub field: String,
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_edit: bool,
}

/// `password` present ⇒ direct creation; absent ⇒ invitation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role_id: RoleId,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub role_id: RoleId,
}

// -------------------------
// Extraction helpers
// -------------------------

/// Unwrap a JSON body, turning axum's rejection into a 400 error body.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
}

pub fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, axum::response::Response> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
}

pub fn parse_user_id(raw: &str) -> Result<UserId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("invalid user id '{raw}'")))
}

pub fn parse_role_id(raw: &str) -> Result<RoleId, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", format!("invalid role id '{raw}'")))
}
