//! Response payload types
//!
//! Wire shapes produced by the renderer. Struct field order is the
//! serialization order consumed by the view layer: `success` first, then
//! `data`, then - only when present - `queryLog` as a sibling top-level key.
//! Optional sections are omitted from the output entirely, never serialized
//! as null.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// Top-level failure envelope.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Always `false`; the renderer only handles the failure path.
    pub success: bool,
    pub data: ErrorData,
    /// Per-connection diagnostic log entries, attached only when non-empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_log: Option<BTreeMap<String, Vec<String>>>,
}

/// Structured body of a failure response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    /// Resolved HTTP status code.
    pub code: u16,
    /// URL of the failed request.
    pub url: String,
    /// Client-facing message; synthesized summary for validation failures.
    pub message: String,
    /// Number of fields that failed validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
    /// Per-field validation messages, in reported order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    /// Debug-mode exception detail; never present in production mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionDetail>,
}

/// Exception detail attached in debug mode, nested recursively along the
/// error's cause chain.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetail {
    pub class: String,
    pub code: u16,
    pub message: String,
    /// Captured stack frames, present only on the outermost entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Box<ExceptionDetail>>,
}

/// Success envelope sharing the `success`-first ordering contract.
#[derive(Debug, Serialize)]
pub struct SuccessPayload<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessPayload<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
