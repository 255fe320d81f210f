use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Maps engine errors onto HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Engine(common::Error),
}

impl From<common::Error> for ApiError {
    fn from(err: common::Error) -> Self {
        ApiError::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
            ApiError::Engine(err) => {
                let status = match &err {
                    common::Error::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    common::Error::Config(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!(error = %err, "API request failed");
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
