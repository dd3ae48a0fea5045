//! Error types module
//!
//! This module provides the error taxonomy consumed by the payload renderer.
//! All failures are unified under the `ApiError` enum, which can represent
//! validation failures (carrying a per-field message map) as well as the usual
//! HTTP error categories. Errors self-describe their response characteristics
//! through the `ErrorMetadata` trait, so the renderer never needs to know the
//! concrete error type.

use std::collections::BTreeMap;
use std::io;

use crate::render::validation_summary;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like conflicts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// The renderer accepts any error implementing this trait plus `std::error::Error`.
pub trait ErrorMetadata {
    /// HTTP status code to return when no other status was resolved
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR"), used in logs
    fn error_code(&self) -> &'static str;

    /// Error kind identifier exposed in debug-mode exception detail
    fn error_type(&self) -> &str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Per-field validation messages, present only for validation failures.
    /// Message order within a field is preserved.
    fn validation_detail(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation {
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// An error that carries its own status code instead of a category default.
    #[error("{message}")]
    Custom { status: u16, message: String },
}

impl ApiError {
    /// Validation failure with a single offending field.
    pub fn validation_field(
        field: impl Into<String>,
        messages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(
            field.into(),
            messages.into_iter().map(Into::into).collect::<Vec<_>>(),
        );
        ApiError::Validation { errors }
    }
}

// Error conversion implementations following Rust best practices

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for ApiError {
    fn from(err: io::Error) -> Self {
        ApiError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        flatten_validation_errors(None, &errors, &mut fields);
        ApiError::Validation { errors: fields }
    }
}

/// Flatten `validator`'s nested error tree into dotted field paths.
/// Nested structs become `parent.child`, list entries `parent[i].child`.
fn flatten_validation_errors(
    prefix: Option<&str>,
    errors: &validator::ValidationErrors,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    for (field, kind) in errors.errors() {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match kind {
            validator::ValidationErrorsKind::Field(list) => {
                let messages = out.entry(name).or_default();
                for error in list {
                    messages.push(
                        error
                            .message
                            .as_ref()
                            .map(|message| message.to_string())
                            .unwrap_or_else(|| error.code.to_string()),
                    );
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                flatten_validation_errors(Some(&name), nested, out);
            }
            validator::ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_name = format!("{}[{}]", name, index);
                    flatten_validation_errors(Some(&item_name), nested, out);
                }
            }
        }
    }
}

impl ErrorMetadata for ApiError {
    fn http_status_code(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 422,
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::Internal(_) | ApiError::InternalWithSource { .. } => 500,
            ApiError::Custom { status, .. } => *status,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) | ApiError::InternalWithSource { .. } => "INTERNAL_ERROR",
            ApiError::Custom { .. } => "ERROR",
        }
    }

    fn error_type(&self) -> &str {
        match self {
            ApiError::Validation { .. } => "Validation",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Internal(_) | ApiError::InternalWithSource { .. } => "Internal",
            ApiError::Custom { .. } => "Custom",
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Validation { errors } => validation_summary(errors.len()),
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::Custom { message, .. } => message.clone(),
            // Internal messages may carry connection strings or paths
            ApiError::Internal(_) | ApiError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ApiError::Validation { .. }
            | ApiError::BadRequest(_)
            | ApiError::Unauthorized(_)
            | ApiError::Forbidden(_)
            | ApiError::NotFound(_) => LogLevel::Debug,
            ApiError::Conflict(_) => LogLevel::Warn,
            ApiError::Internal(_) | ApiError::InternalWithSource { .. } => LogLevel::Error,
            ApiError::Custom { status, .. } => {
                if *status >= 500 {
                    LogLevel::Error
                } else {
                    LogLevel::Debug
                }
            }
        }
    }

    fn validation_detail(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ApiError::Validation { errors } => Some(errors),
            _ => None,
        }
    }
}
