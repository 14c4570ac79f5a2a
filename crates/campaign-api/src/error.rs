//! Error types for the campaign API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use campaign_dispatcher::{DispatchError, DispatchResponse};
use database::DatabaseError;
use thiserror::Error;

/// Errors a handler can return.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Dispatch rejected or failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Database error outside a dispatch run.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Dispatch(err) => match err {
                DispatchError::Payload(_) => StatusCode::BAD_REQUEST,
                DispatchError::Precondition(_) => StatusCode::CONFLICT,
                DispatchError::Configuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DispatchError::AudienceResolution(_) => StatusCode::BAD_GATEWAY,
                DispatchError::RunFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Database(DatabaseError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let body = match &self {
            ApiError::Dispatch(err) => DispatchResponse::failed(err),
            ApiError::Database(err) => DispatchResponse {
                success: false,
                message: None,
                error: Some(err.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
