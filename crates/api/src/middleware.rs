use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

use fieldgate_infra::SessionIssuer;

use crate::app::errors::{app_error_to_response, json_error};
use crate::context::{PrincipalContext, RequestId};

#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionIssuer>,
}

/// Resolve the bearer token into a [`PrincipalContext`]; 401 otherwise.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "missing bearer token"))?;

    let principal = state.sessions.authenticate(token).map_err(app_error_to_response)?;
    tracing::Span::current().record("user_id", tracing::field::display(principal.user_id));

    req.extensions_mut().insert(PrincipalContext::new(principal));
    Ok(next.run(req).await)
}

/// Run the request inside an `http.request` span carrying a fresh request id,
/// echoed back in `x-request-id`.
pub async fn request_span(mut req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let request_id = RequestId::new();
    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        user_id = tracing::field::Empty,
    );
    req.extensions_mut().insert(request_id);

    async move {
        let started = Instant::now();
        let mut res = next.run(req).await;
        tracing::info!(
            status = res.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            res.headers_mut().insert("x-request-id", value);
        }
        res
    }
    .instrument(span)
    .await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
