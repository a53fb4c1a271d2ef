//! API error handling.
//!
//! Maps application errors onto HTTP status codes and a JSON error body.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::application::AppError;

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// HTTP status code, echoed in the body.
    pub status: u16,
    /// Stable code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error response containing status code and error details.
#[derive(Debug, Clone)]
pub struct ApiErrorResponse {
    pub status: StatusCode,
    pub error: ApiError,
}

impl ApiErrorResponse {
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError {
                status: status.as_u16(),
                code: code.into(),
                message: message.into(),
            },
        }
    }

    #[must_use]
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<AppError> for ApiErrorResponse {
    fn from(error: AppError) -> Self {
        let status = match &error {
            AppError::InvalidUsername(_) | AppError::AmountOutOfRange(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::BalanceOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::WalletNotFound(_) | AppError::CounterpartyNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Store(_) | AppError::Commit(_) | AppError::InternalFault(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal errors should not expose details to clients.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(code = error.code(), %error, "Request failed");
            "An internal error occurred".to_string()
        } else {
            tracing::info!(code = error.code(), %error, "Request rejected");
            error.to_string()
        };

        Self::new(status, error.code(), message)
    }
}

impl From<JsonRejection> for ApiErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(%rejection, "Failed to decode JSON body");
        Self::bad_request("ERR_INVALID_JSON_BODY", rejection.body_text())
    }
}
