use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// Rejects `/api/*` requests without `Authorization: Bearer <DASHBOARD_TOKEN>`.
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if token_matches(&state, bearer_token(&headers)) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Rejected unauthenticated dashboard request");
    unauthorized()
}

/// Shared by the bearer middleware and the WebSocket query-token check.
pub(crate) fn token_matches(state: &AppState, candidate: Option<&str>) -> bool {
    candidate.is_some_and(|t| !state.dashboard_token.is_empty() && t == state.dashboard_token)
}

pub(crate) fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized"})),
    )
        .into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
