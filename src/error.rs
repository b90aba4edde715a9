//! Unified API error handling
//!
//! Provides consistent error responses across all endpoints and maps the
//! procurement error taxonomy onto HTTP statuses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::procurement::ProcurementError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Procurement(#[from] ProcurementError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Procurement(e) => match e {
                ProcurementError::Validation(_) => StatusCode::BAD_REQUEST,
                ProcurementError::Authorization(_) => StatusCode::FORBIDDEN,
                ProcurementError::StateConflict(_)
                | ProcurementError::DuplicateBid
                | ProcurementError::AlreadyAwarded => StatusCode::CONFLICT,
                ProcurementError::WindowClosed => StatusCode::UNPROCESSABLE_ENTITY,
                ProcurementError::OperationFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Procurement(e) => match e {
                ProcurementError::Validation(_) => "VALIDATION_ERROR",
                ProcurementError::Authorization(_) => "AUTHORIZATION_ERROR",
                ProcurementError::StateConflict(_) => "STATE_CONFLICT",
                ProcurementError::WindowClosed => "WINDOW_CLOSED",
                ProcurementError::DuplicateBid => "DUPLICATE_BID",
                ProcurementError::AlreadyAwarded => "ALREADY_AWARDED",
                ProcurementError::OperationFailed { .. } => "OPERATION_FAILED",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn retryable(&self) -> Option<bool> {
        match self {
            Self::Procurement(ProcurementError::OperationFailed { retryable }) => Some(*retryable),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg) => msg.clone(),
            Self::Procurement(e) => e.to_string(),
            // Don't leak internal error details
            Self::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            retryable: self.retryable(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
