use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::{ErrorResponse, JobId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable after {attempts} attempt(s): {source}")]
    Unavailable {
        attempts: u32,
        #[source]
        source: rusqlite::Error,
    },

    #[error("store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid job: {0}")]
    Validation(String),

    #[error("job {0} not found")]
    NotFound(JobId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced over HTTP.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Dispatch(DispatchError::Validation(msg)) => {
                log::warn!("Rejected job: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorResponse::with_details("Bad request", msg.clone()))
            }
            ApiError::Dispatch(DispatchError::NotFound(id)) => {
                log::warn!("Job {} not found", id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            // Store failures are answered with 404 like every other lookup failure.
            ApiError::Dispatch(DispatchError::Store(err)) => {
                log::error!("Store error: {}", err);
                (StatusCode::NOT_FOUND, ErrorResponse::with_details("Store error", err.to_string()))
            }
            ApiError::BadRequest(msg) => {
                log::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorResponse::with_details("Bad request", msg.clone()))
            }
            ApiError::Internal(msg) => {
                log::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new("Internal server error"))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
