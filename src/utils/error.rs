use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::db::StoreError;
use crate::polls::validation::{FieldError, SelectionRejection, ValidationErrors};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("{}", .0.message())]
    InvalidSelection(SelectionRejection),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("{0}")]
    NotFound(String),

    #[error("You have already voted in this poll")]
    AlreadyVoted,

    #[error("This poll has expired")]
    PollInactive,

    #[error("Failed to generate unique poll code")]
    CodeSpaceExhausted,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl AppError {
    pub fn poll_not_found() -> Self {
        AppError::NotFound("Poll not found".to_string())
    }

    /// Stable, machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::InvalidSelection(reason) => reason.code(),
            AppError::MalformedBody(_) => "MALFORMED_BODY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyVoted => "ALREADY_VOTED",
            AppError::PollInactive => "POLL_INACTIVE",
            AppError::CodeSpaceExhausted => "CODE_SPACE_EXHAUSTED",
            AppError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed(_)
            | AppError::InvalidSelection(_)
            | AppError::MalformedBody(_)
            | AppError::AlreadyVoted
            | AppError::PollInactive => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CodeSpaceExhausted | AppError::StorageUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            AppError::ValidationFailed(errors) => (errors.to_string(), Some(errors.into_inner())),
            AppError::StorageUnavailable(msg) => {
                error!(error = %msg, "storage operation failed");
                (
                    "A storage error occurred, please retry".to_string(),
                    None,
                )
            }
            AppError::CodeSpaceExhausted => {
                error!("poll code reservation exhausted its attempts");
                (AppError::CodeSpaceExhausted.to_string(), None)
            }
            AppError::MalformedBody(msg) => (msg, None),
            other => (other.to_string(), None),
        };

        let error_response = ErrorResponse {
            success: false,
            error: code.to_string(),
            message,
            details,
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StorageUnavailable(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationFailed(errors)
    }
}

impl From<SelectionRejection> for AppError {
    fn from(reason: SelectionRejection) -> Self {
        AppError::InvalidSelection(reason)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}
