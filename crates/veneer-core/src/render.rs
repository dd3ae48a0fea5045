//! Error payload renderer
//!
//! Converts a raised error into the structured failure envelope plus the HTTP
//! status code to send with it. The renderer is the last line of defense on
//! the failure path: it never raises, and every internal lookup failure
//! degrades to a safe default instead of masking the original error.

use std::backtrace::Backtrace;

use crate::error::ErrorMetadata;
use crate::hooks::{QueryLogSource, StatusSource};
use crate::payload::{ErrorData, ErrorPayload, ExceptionDetail};

/// Nested causes rendered before the chain is cut off.
const MAX_CAUSE_DEPTH: usize = 5;

/// Stateless payload renderer. `debug` gates the exception detail section;
/// production mode exposes only message, code, and per-field validation
/// messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorRenderer {
    debug: bool,
    single_message: bool,
}

impl ErrorRenderer {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            single_message: false,
        }
    }

    /// When enabled, a validation failure with exactly one field carrying
    /// exactly one message uses that message verbatim instead of the
    /// synthesized summary.
    pub fn with_single_message(mut self, single_message: bool) -> Self {
        self.single_message = single_message;
        self
    }

    /// Render `error` into a failure payload. Infallible: collaborator
    /// failures are swallowed and logged at debug level.
    pub fn render<E>(
        &self,
        error: &E,
        request_url: &str,
        status: &dyn StatusSource,
        query_log: &dyn QueryLogSource,
    ) -> ErrorPayload
    where
        E: ErrorMetadata + std::error::Error,
    {
        let code = resolve_status(error, status);

        let (message, error_count, errors) = match error.validation_detail() {
            Some(detail) => (
                self.validation_message(detail),
                Some(detail.len()),
                Some(detail.clone()),
            ),
            None => (error.client_message(), None, None),
        };

        let exception = self
            .debug
            .then(|| exception_detail(error, code));

        let logs = query_log.query_logs();
        let query_log = (!logs.is_empty()).then_some(logs);

        ErrorPayload {
            success: false,
            data: ErrorData {
                code,
                url: request_url.to_string(),
                message,
                error_count,
                errors,
                exception,
            },
            query_log,
        }
    }

    fn validation_message(
        &self,
        errors: &std::collections::BTreeMap<String, Vec<String>>,
    ) -> String {
        if self.single_message {
            if let Some((_, messages)) = errors.iter().next() {
                if errors.len() == 1 && messages.len() == 1 {
                    return messages[0].clone();
                }
            }
        }
        validation_summary(errors.len())
    }
}

/// Summary message for `count` fields that failed validation.
pub(crate) fn validation_summary(count: usize) -> String {
    if count == 1 {
        "A validation error occurred".to_string()
    } else {
        format!("{} validation errors occurred", count)
    }
}

/// Resolve the status to report: a status already carried by the sink wins,
/// but only error-class codes are trusted. A failing probe falls back to the
/// error's own status.
fn resolve_status<E: ErrorMetadata>(error: &E, status: &dyn StatusSource) -> u16 {
    match status.status_code() {
        Ok(Some(code)) if code >= 400 => code,
        Ok(_) => error.http_status_code(),
        Err(probe_error) => {
            tracing::debug!(
                error = %probe_error,
                fallback = error.http_status_code(),
                "Status probe failed, using the error's own status"
            );
            error.http_status_code()
        }
    }
}

fn exception_detail<E>(error: &E, code: u16) -> ExceptionDetail
where
    E: ErrorMetadata + std::error::Error,
{
    ExceptionDetail {
        class: error.error_type().to_string(),
        code,
        message: error.to_string(),
        trace: Some(capture_trace()),
        caused_by: cause_chain(error.source(), code, 0),
    }
}

/// Nested cause entries share the outer shape; concrete types are erased by
/// `std::error::Error`, so causes carry the generic class name.
fn cause_chain(
    source: Option<&(dyn std::error::Error + 'static)>,
    code: u16,
    depth: usize,
) -> Option<Box<ExceptionDetail>> {
    let error = source?;
    if depth >= MAX_CAUSE_DEPTH {
        return Some(Box::new(ExceptionDetail {
            class: "Error".to_string(),
            code,
            message: "... (truncated)".to_string(),
            trace: None,
            caused_by: None,
        }));
    }
    Some(Box::new(ExceptionDetail {
        class: "Error".to_string(),
        code,
        message: error.to_string(),
        trace: None,
        caused_by: cause_chain(error.source(), code, depth + 1),
    }))
}

fn capture_trace() -> Vec<String> {
    Backtrace::force_capture()
        .to_string()
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::hooks::{MemoryQueryLog, NoQueryLog, NoStatus};

    struct FailingStatus;

    impl StatusSource for FailingStatus {
        fn status_code(&self) -> anyhow::Result<Option<u16>> {
            Err(anyhow::anyhow!("response not available"))
        }
    }

    struct FixedStatus(u16);

    impl StatusSource for FixedStatus {
        fn status_code(&self) -> anyhow::Result<Option<u16>> {
            Ok(Some(self.0))
        }
    }

    #[test]
    fn test_generic_error_debug_off_has_no_exception() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::NotFound("Teapot not found".to_string());
        let payload = renderer.render(&err, "/teapots/1", &NoStatus, &NoQueryLog);

        assert!(!payload.success);
        assert_eq!(payload.data.code, 404);
        assert_eq!(payload.data.url, "/teapots/1");
        assert_eq!(payload.data.message, "Teapot not found");
        assert!(payload.data.error_count.is_none());
        assert!(payload.data.errors.is_none());
        assert!(payload.data.exception.is_none());
        assert!(payload.query_log.is_none());

        // No class name or trace anywhere on the wire
        let text = serde_json::to_string(&payload).expect("serialize");
        assert!(!text.contains("NotFound"));
        assert!(!text.contains("trace"));
    }

    #[test]
    fn test_generic_error_debug_on_exposes_kind_and_status() {
        let renderer = ErrorRenderer::new(true);
        let err = ApiError::NotFound("Teapot not found".to_string());
        let payload = renderer.render(&err, "/teapots/1", &NoStatus, &NoQueryLog);

        let exception = payload.data.exception.expect("exception detail");
        assert_eq!(exception.class, "NotFound");
        assert_eq!(exception.code, 404);
        assert_eq!(exception.message, "Not found: Teapot not found");
        assert!(exception.trace.is_some());
    }

    #[test]
    fn test_debug_on_walks_cause_chain() {
        let renderer = ErrorRenderer::new(true);
        let source = anyhow::anyhow!("connection refused").context("query failed");
        let err = ApiError::InternalWithSource {
            message: "lookup failed".to_string(),
            source,
        };
        let payload = renderer.render(&err, "/articles", &NoStatus, &NoQueryLog);

        let exception = payload.data.exception.expect("exception detail");
        assert_eq!(exception.class, "Internal");
        let cause = exception.caused_by.expect("outer cause");
        assert_eq!(cause.message, "query failed");
        let inner = cause.caused_by.expect("inner cause");
        assert_eq!(inner.message, "connection refused");
        assert!(inner.trace.is_none());
    }

    #[test]
    fn test_validation_single_field_uses_summary_by_default() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::validation_field("title", ["Title cannot be empty"]);
        let payload = renderer.render(&err, "/articles", &NoStatus, &NoQueryLog);

        assert_eq!(payload.data.code, 422);
        assert_eq!(payload.data.message, "A validation error occurred");
        assert_eq!(payload.data.error_count, Some(1));
        let errors = payload.data.errors.expect("errors map");
        assert_eq!(errors["title"], vec!["Title cannot be empty".to_string()]);
    }

    #[test]
    fn test_validation_single_message_mode() {
        let renderer = ErrorRenderer::new(false).with_single_message(true);
        let err = ApiError::validation_field("title", ["Title cannot be empty"]);
        let payload = renderer.render(&err, "/articles", &NoStatus, &NoQueryLog);
        assert_eq!(payload.data.message, "Title cannot be empty");
        assert_eq!(payload.data.error_count, Some(1));

        // Two messages on one field: back to the summary
        let err = ApiError::validation_field("title", ["too short", "not ascii"]);
        let payload = renderer.render(&err, "/articles", &NoStatus, &NoQueryLog);
        assert_eq!(payload.data.message, "A validation error occurred");
    }

    #[test]
    fn test_validation_two_fields_summary_and_count() {
        let renderer = ErrorRenderer::new(false);
        let mut errors = std::collections::BTreeMap::new();
        errors.insert("title".to_string(), vec!["m1".to_string()]);
        errors.insert("body".to_string(), vec!["m2".to_string()]);
        let err = ApiError::Validation { errors };
        let payload = renderer.render(&err, "/articles", &NoStatus, &NoQueryLog);

        assert_eq!(payload.data.message, "2 validation errors occurred");
        assert_eq!(payload.data.error_count, Some(2));
        let errors = payload.data.errors.expect("errors map");
        assert_eq!(errors["title"], vec!["m1".to_string()]);
        assert_eq!(errors["body"], vec!["m2".to_string()]);
    }

    #[test]
    fn test_failing_status_probe_falls_back_to_422() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::validation_field("title", ["m1"]);
        let payload = renderer.render(&err, "/articles", &FailingStatus, &NoQueryLog);
        assert_eq!(payload.data.code, 422);
    }

    #[test]
    fn test_failing_status_probe_falls_back_to_500() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::Internal("boom".to_string());
        let payload = renderer.render(&err, "/", &FailingStatus, &NoQueryLog);
        assert_eq!(payload.data.code, 500);
    }

    #[test]
    fn test_sink_error_status_wins_over_category_default() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::Internal("boom".to_string());
        let payload = renderer.render(&err, "/", &FixedStatus(503), &NoQueryLog);
        assert_eq!(payload.data.code, 503);
    }

    #[test]
    fn test_sink_success_status_is_ignored() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::NotFound("gone".to_string());
        let payload = renderer.render(&err, "/", &FixedStatus(200), &NoQueryLog);
        assert_eq!(payload.data.code, 404);
    }

    #[test]
    fn test_query_log_attached_when_non_empty() {
        let renderer = ErrorRenderer::new(false);
        let log = MemoryQueryLog::new();
        log.record("test", "query");
        let err = ApiError::Internal("boom".to_string());
        let payload = renderer.render(&err, "/", &NoStatus, &log);

        let query_log = payload.query_log.expect("query log");
        assert_eq!(query_log["test"][0], "query");
    }

    #[test]
    fn test_query_log_omitted_when_empty() {
        let renderer = ErrorRenderer::new(false);
        let err = ApiError::Internal("boom".to_string());
        let payload = renderer.render(&err, "/", &NoStatus, &MemoryQueryLog::new());
        assert!(payload.query_log.is_none());
    }
}
