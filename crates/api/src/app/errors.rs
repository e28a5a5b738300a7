use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fieldgate_core::{AppError, ErrorKind};

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn app_error_to_response(err: AppError) -> axum::response::Response {
    let kind = err.kind();
    let status = status_for(kind);
    if kind == ErrorKind::Store {
        tracing::error!(error = %err, "request failed in the store");
    }

    match err {
        AppError::MissingFields(fields) => (
            status,
            axum::Json(json!({
                "error": kind.code(),
                "message": format!("missing required fields: {}", fields.join(", ")),
                "fields": fields,
            })),
        )
            .into_response(),
        AppError::Authentication(msg)
        | AppError::Authorization(msg)
        | AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::Store(msg) => json_error(status, kind.code(), msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::Authentication), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Authorization), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Store), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_fields_response_is_a_bad_request() {
        let res = app_error_to_response(AppError::MissingFields(vec!["name".into()]));
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_failures_do_not_echo_driver_text() {
        let driver = "insert_record failed: null value in column \"name\" of relation \"employees\"";
        let res = app_error_to_response(fieldgate_infra::StoreError::Query(driver.into()).into());
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "store_error");
        assert_eq!(body["message"], "internal store error");
        assert!(!String::from_utf8_lossy(&bytes).contains("employees"));
    }
}
