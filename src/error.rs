use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::guidance::GuidanceError;
use crate::ledger::LedgerError;

#[derive(Debug)]
pub enum AppError {
    InvalidAmount(String),
    InvalidRequest(String),
    NotFound(String),
    Unauthorized(String),
    /// Write conflicts outlasted the retry budget. Safe to retry.
    Conflict(String),
    StoreUnavailable(String),
    GuidanceUnavailable(String),
    GuidanceFailed(String),
    SerializationError(String),
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GuidanceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GuidanceFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the same call may succeed if repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Conflict(_) | AppError::StoreUnavailable(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            AppError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::StoreUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::GuidanceUnavailable(msg) => write!(f, "Guidance unavailable: {}", msg),
            AppError::GuidanceFailed(msg) => write!(f, "Guidance failed: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount(msg) => AppError::InvalidAmount(msg),
            LedgerError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            LedgerError::RequestNotFound(id) => AppError::NotFound(format!("funding request {}", id)),
            LedgerError::BusinessNotFound(id) => AppError::NotFound(format!("business {}", id)),
            LedgerError::ConflictRetryExhausted(msg) => AppError::Conflict(msg),
            LedgerError::StoreUnavailable(msg) => AppError::StoreUnavailable(msg),
        }
    }
}

impl From<GuidanceError> for AppError {
    fn from(err: GuidanceError) -> Self {
        match err {
            GuidanceError::NotConfigured => AppError::GuidanceUnavailable(err.to_string()),
            GuidanceError::InvalidInput(msg) => AppError::InvalidRequest(msg),
            GuidanceError::Transport(_) | GuidanceError::InvalidOutput(_) => {
                AppError::GuidanceFailed(err.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}
