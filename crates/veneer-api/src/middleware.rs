//! Request context middleware
//!
//! Fills in the two pieces of context `IntoResponse` cannot see: the request
//! URL and the per-request query log. The middleware installs a
//! [`MemoryQueryLog`] as a request extension for handlers to record into,
//! and re-renders any failure payload produced downstream with the full
//! context.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use veneer_core::{ErrorRenderer, MemoryQueryLog, StatusSource};

use crate::error::{is_debug_env, PendingError};

/// Per-request query log handle, available to handlers as
/// `Extension<QueryLogHandle>` once the context middleware is installed.
#[derive(Clone)]
pub struct QueryLogHandle(pub Arc<MemoryQueryLog>);

impl QueryLogHandle {
    pub fn record(&self, connection: &str, entry: impl Into<String>) {
        self.0.record(connection, entry);
    }
}

/// Status already written to the outgoing response.
struct ResponseStatus(StatusCode);

impl StatusSource for ResponseStatus {
    fn status_code(&self) -> anyhow::Result<Option<u16>> {
        Ok(Some(self.0.as_u16()))
    }
}

/// Layer with `axum::middleware::from_fn(error_payload_context)`.
pub async fn error_payload_context(mut req: Request, next: Next) -> Response {
    let request_url = req.uri().to_string();
    let query_log = Arc::new(MemoryQueryLog::new());
    req.extensions_mut()
        .insert(QueryLogHandle(query_log.clone()));

    let mut response = next.run(req).await;

    let Some(PendingError(error)) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    // Already logged when the error was first rendered
    let status = response.status();
    let renderer = ErrorRenderer::new(is_debug_env());
    let payload = renderer.render(
        error.as_ref(),
        &request_url,
        &ResponseStatus(status),
        query_log.as_ref(),
    );
    (status, Json(payload)).into_response()
}
