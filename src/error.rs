use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for one dispatch attempt. Every variant except the ones
/// raised before the loop starts is handled locally and degrades into a
/// rejected outcome.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed event payload: {0}")]
    Decode(String),

    #[error("candidate lookup unavailable: {0}")]
    LookupUnavailable(String),

    #[error("offer probe timed out")]
    ProbeTimeout,

    #[error("offer probe failed: {0}")]
    Probe(String),

    #[error("driver {0} is already assigned")]
    AssignConflict(String),

    #[error("driver {0} is already registered")]
    DriverExists(String),

    #[error("unknown driver: {0}")]
    UnknownDriver(String),

    #[error("failed to publish event: {0}")]
    Publish(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match &err {
            DispatchError::UnknownDriver(id) => {
                AppError::NotFound(format!("driver {id} not found"))
            }
            DispatchError::AssignConflict(_) | DispatchError::DriverExists(_) => {
                AppError::Conflict(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
