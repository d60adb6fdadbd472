//! Error types for the pdfgen API
//!
//! Every failure becomes a JSON body; a PDF is only ever sent on success.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use latex_engine::{CompileFailure, EngineError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The request body or query could not be extracted
    #[error("Request rejected: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("LaTeX toolchain unavailable: {0}")]
    ToolchainUnavailable(Box<CompileFailure>),

    #[error("Compilation failed: {0}")]
    Compile(Box<CompileFailure>),

    #[error("Update conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Invalid(msg) => ApiError::Validation(msg),
            EngineError::TemplateNotFound(name) => {
                ApiError::Validation(format!("Unknown template '{}'", name))
            }
            EngineError::Compile(failure) if failure.is_toolchain_unavailable() => {
                ApiError::ToolchainUnavailable(failure)
            }
            EngineError::Compile(failure) => ApiError::Compile(failure),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

macro_rules! rejection {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for ApiError {
                fn from(rejection: $ty) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

rejection!(JsonRejection, QueryRejection, MultipartRejection, MultipartError);

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: &'static str,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", what),
                None,
            ),
            ApiError::Rejected { status, message } => {
                let code = if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE"
                } else {
                    "VALIDATION_ERROR"
                };
                (*status, code, message.clone(), None)
            }
            ApiError::ToolchainUnavailable(failure) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "TOOLCHAIN_UNAVAILABLE",
                failure.message.clone(),
                serde_json::to_value(failure).ok(),
            ),
            ApiError::Compile(failure) => {
                let (status, code) = if failure.is_timeout() {
                    (StatusCode::GATEWAY_TIMEOUT, "COMPILE_TIMEOUT")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "COMPILE_FAILED")
                };
                (
                    status,
                    code,
                    failure.message.clone(),
                    serde_json::to_value(failure).ok(),
                )
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "UPDATE_CONFLICT", msg.clone(), None),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "Database error".to_string(),
                    None,
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code,
            status: status.as_u16(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
