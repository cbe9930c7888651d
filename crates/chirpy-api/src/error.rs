use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use chirpy_db::StoreError;
use chirpy_types::api::ErrorResponse;

/// Handler-level error. Store errors keep their kind so each maps to its
/// own status; anything unexpected collapses to an opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    /// Same body text as `Unauthorized`; only the status differs.
    #[error("Unauthorized")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Unauthorized".to_string()),
            ApiError::Store(StoreError::NotFound(kind)) => {
                (StatusCode::NOT_FOUND, format!("{kind} not found"))
            }
            ApiError::Store(StoreError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            ApiError::Store(err) => {
                error!("store error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
            ApiError::Internal(err) => {
                error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
