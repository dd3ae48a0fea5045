//! HTTP error response conversion
//!
//! This module provides the axum-specific rendering of `ApiError`.
//!
//! **Preferred handler pattern:** Return `Result<impl IntoResponse, HttpApiError>`.
//! Use `ApiError` (or types that implement `Into<ApiError>`) for errors and `?`
//! so they become `HttpApiError` and render consistently (status, payload,
//! logging). Layer [`crate::middleware::error_payload_context`] on the router
//! to fill in the request URL and per-request query log.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;
use veneer_core::{
    ApiError, ErrorMetadata, ErrorRenderer, LogLevel, NoQueryLog, NoStatus, ProjectionError,
    QueryLogSource, StatusSource,
};

/// Wrapper type for ApiError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for ApiError (external type from veneer-core)
#[derive(Debug)]
pub struct HttpApiError(pub ApiError);

impl From<ApiError> for HttpApiError {
    fn from(err: ApiError) -> Self {
        HttpApiError(err)
    }
}

impl From<anyhow::Error> for HttpApiError {
    fn from(err: anyhow::Error) -> Self {
        HttpApiError(ApiError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<ProjectionError> for HttpApiError {
    fn from(err: ProjectionError) -> Self {
        HttpApiError(ApiError::from(err))
    }
}

impl From<validator::ValidationErrors> for HttpApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        HttpApiError(ApiError::from(errors))
    }
}

/// Convert JSON body deserialization failures into a 400 with the standard
/// failure payload.
impl From<JsonRejection> for HttpApiError {
    fn from(rejection: JsonRejection) -> Self {
        HttpApiError(ApiError::BadRequest(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// Marker stashed in response extensions so the context middleware can
/// re-render the payload with the request URL and query log.
#[derive(Clone)]
pub(crate) struct PendingError(pub(crate) Arc<ApiError>);

fn log_error(error: &ApiError) {
    let error_type = error.error_type();
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type, code, "Request failed");
        }
    }
}

/// Debug mode is opt-in per deployment; production never leaks exception
/// detail by default.
pub fn is_debug_env() -> bool {
    std::env::var("VENEER_DEBUG")
        .or_else(|_| std::env::var("APP_DEBUG"))
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        log_error(&error);

        // The request URL is unknown at this layer; the context middleware
        // rewrites the payload when it is installed.
        let renderer = ErrorRenderer::new(is_debug_env());
        let payload = renderer.render(&error, "", &NoStatus, &NoQueryLog);
        let status =
            StatusCode::from_u16(payload.data.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, Json(payload)).into_response();
        response.extensions_mut().insert(PendingError(Arc::new(error)));
        response
    }
}

/// Render an error response with explicit request context, for callers that
/// carry the URL, a status probe, and a per-request query log themselves.
pub fn render_error_response(
    error: ApiError,
    request_url: &str,
    renderer: &ErrorRenderer,
    status: &dyn StatusSource,
    query_log: &dyn QueryLogSource,
) -> Response {
    log_error(&error);
    let payload = renderer.render(&error, request_url, status, query_log);
    let status =
        StatusCode::from_u16(payload.data.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(payload)).into_response()
}

/// JSON body extractor that deserializes and then validates the payload.
/// A deserialization failure renders as a 400, a validation failure as a 422
/// carrying the per-field messages. Use this instead of `Json<T>` when the
/// body type derives `validator::Validate`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpApiError::from)?;
        value.validate().map_err(HttpApiError::from)?;
        Ok(ValidatedJson(value))
    }
}
