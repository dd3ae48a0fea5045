//! Collaborator traits for the renderer
//!
//! The renderer runs on the failure path of the host application, so its
//! collaborators are narrow trait interfaces the host implements: a probe for
//! the status already carried by the outgoing response, and a collector of
//! diagnostic query logs recorded while servicing the failed request. No-op
//! implementations are provided for hosts that supply neither.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Probe for a status code already carried by the response sink.
///
/// The probe is allowed to fail; the renderer swallows the failure and falls
/// back to the error's own status rather than masking the original error.
pub trait StatusSource {
    fn status_code(&self) -> anyhow::Result<Option<u16>>;
}

/// No status carried by the sink; the error's own status is used.
pub struct NoStatus;

impl StatusSource for NoStatus {
    fn status_code(&self) -> anyhow::Result<Option<u16>> {
        Ok(None)
    }
}

/// Collector of per-connection diagnostic log entries.
///
/// An empty map means no diagnostic section is attached to the payload.
pub trait QueryLogSource {
    fn query_logs(&self) -> BTreeMap<String, Vec<String>>;
}

/// No diagnostic logs available.
pub struct NoQueryLog;

impl QueryLogSource for NoQueryLog {
    fn query_logs(&self) -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }
}

/// In-memory per-request recorder. The host records entries while servicing
/// the request; the renderer reads them back if the request fails.
#[derive(Debug, Default)]
pub struct MemoryQueryLog {
    entries: Mutex<BTreeMap<String, Vec<String>>>,
}

impl MemoryQueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, connection: &str, entry: impl Into<String>) {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .entry(connection.to_string())
            .or_default()
            .push(entry.into());
    }
}

impl QueryLogSource for MemoryQueryLog {
    fn query_logs(&self) -> BTreeMap<String, Vec<String>> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_op_sources() {
        assert!(NoStatus.status_code().expect("no status").is_none());
        assert!(NoQueryLog.query_logs().is_empty());
    }

    #[test]
    fn test_memory_query_log_records_in_order() {
        let log = MemoryQueryLog::new();
        log.record("default", "SELECT 1");
        log.record("default", "SELECT 2");
        log.record("replica", "SELECT 3");

        let logs = log.query_logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs["default"], vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(logs["replica"], vec!["SELECT 3"]);
    }
}
