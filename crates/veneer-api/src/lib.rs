//! Veneer API Library
//!
//! This crate provides the axum integration for Veneer: the `IntoResponse`
//! wrapper rendering errors as structured failure payloads, the validated
//! JSON body extractor, the `fields` query extractor, and the request
//! context middleware. No routes or server setup are owned here; the host
//! application wires these into its own router.

pub mod error;
pub mod extract;
pub mod middleware;

// Re-exports
pub use error::{is_debug_env, render_error_response, HttpApiError, ValidatedJson};
pub use extract::FieldSelection;
pub use middleware::{error_payload_context, QueryLogHandle};
pub use veneer_core::{
    resolve_fields, ApiError, ErrorPayload, ErrorRenderer, FieldPolicy, Projection,
    ResourceSchema, SuccessPayload,
};
