use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use thiserror::Error;

use crate::response::Envelope;

// ─── Error codes ─────────────────────────────────────────────────

/// Numeric error codes carried in the `errno` field of every response.
///
/// 1000–1999 are client errors, 5000–5999 server errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success,

    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    TooManyRequests,
    InvalidToken,
    ExpiredToken,
    InvalidFormat,

    InternalServer,
    Database,
    Cache,
    NotImplemented,
    ThirdParty,
    Config,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::BadRequest => 1000,
            Self::Unauthorized => 1001,
            Self::Forbidden => 1003,
            Self::NotFound => 1004,
            Self::Validation => 1005,
            Self::Conflict => 1009,
            Self::TooManyRequests => 1029,
            Self::InvalidToken => 1030,
            Self::ExpiredToken => 1031,
            Self::InvalidFormat => 1032,
            Self::InternalServer => 5000,
            Self::Database => 5001,
            Self::Cache => 5002,
            Self::NotImplemented => 5003,
            Self::ThirdParty => 5004,
            Self::Config => 5005,
        }
    }

    pub fn standard_message(self) -> &'static str {
        match self {
            Self::Success => "",
            Self::BadRequest => "Invalid parameters",
            Self::Unauthorized => "Authentication required",
            Self::Forbidden => "Permission denied",
            Self::NotFound => "Resource not found",
            Self::Validation => "Validation error",
            Self::Conflict => "Resource conflict",
            Self::TooManyRequests => "Too many requests",
            Self::InvalidToken => "Invalid token",
            Self::ExpiredToken => "Token expired",
            Self::InvalidFormat => "Invalid data format",
            Self::InternalServer => "Internal server error",
            Self::Database => "Database error",
            Self::Cache => "Cache error",
            Self::NotImplemented => "Feature not implemented",
            Self::ThirdParty => "Third-party service error",
            Self::Config => "Configuration error",
        }
    }

    pub fn is_client_error(self) -> bool {
        (1000..2000).contains(&self.as_i32())
    }

    pub fn is_server_error(self) -> bool {
        (5000..6000).contains(&self.as_i32())
    }

    pub fn http_status(self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            code if code.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ─── Unified error type ──────────────────────────────────────────

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
#[error("[{}] {message}", .code.as_i32())]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// Structured detail rendered into the envelope's `data` slot.
    pub detail: Option<Value>,
}

/// Attached to every error response so the lifecycle emitter can tell that
/// the handler chain failed and why.
#[derive(Debug, Clone)]
pub struct RecordedError(pub String);

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }

    /// Error carrying the code's standard message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.standard_message())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServer, message)
    }

    /// Validation failure with per-field messages.
    pub fn validation(fields: BTreeMap<String, String>) -> Self {
        let detail = serde_json::to_value(&fields).ok();
        Self {
            code: ErrorCode::Validation,
            message: ErrorCode::Validation.standard_message().into(),
            detail,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.http_status()
    }
}

// Extractor rejections still go out as envelopes.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(ErrorCode::InvalidFormat, rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let recorded = RecordedError(self.to_string());

        let mut response = status.into_response();
        response.extensions_mut().insert(Envelope {
            errno: self.code.as_i32(),
            errmsg: self.message,
            data: self.detail.unwrap_or(Value::Null),
        });
        response.extensions_mut().insert(recorded);
        response
    }
}
