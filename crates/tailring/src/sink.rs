//! Hand-off point between ingestion workers and the decision service.
//!
//! Workers call [`AnomalySink::report`] from their own threads at every batch
//! boundary, so implementations must return quickly and never fail: delivery
//! is at-most-once, and a lost report is logged by the implementation, not
//! surfaced to ingestion.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Suspect trace ids a worker flagged within one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    /// Logical batch position (not reduced modulo the ring capacity)
    pub batch_pos: u64,
    /// Sorted, de-duplicated trace ids
    pub trace_ids: Vec<String>,
}

impl AnomalyReport {
    /// Encodes the trace ids as the JSON array carried in `traceIdListJson`.
    pub fn trace_id_list_json(&self) -> String {
        // Serializing a Vec<String> can't fail.
        serde_json::to_string(&self.trace_ids).unwrap_or_else(|_| String::from("[]"))
    }
}

/// Receiver of per-batch anomaly sets and of the end-of-stream signal.
pub trait AnomalySink: Send + Sync {
    /// Delivers one non-empty anomaly set. Must not block ingestion.
    fn report(&self, report: AnomalyReport);

    /// Signals that every worker has finished. Called exactly once per run.
    fn finish(&self);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AnomalySink for NullSink {
    fn report(&self, _report: AnomalyReport) {}

    fn finish(&self) {}
}

/// Sink that keeps every report in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<AnomalyReport>>,
    finished: AtomicUsize,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far, in arrival order.
    pub fn reports(&self) -> Vec<AnomalyReport> {
        self.reports.lock().clone()
    }

    /// Union of all reported trace ids for one batch position.
    pub fn trace_ids_for(&self, batch_pos: u64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .reports
            .lock()
            .iter()
            .filter(|r| r.batch_pos == batch_pos)
            .flat_map(|r| r.trace_ids.iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// How many times `finish` was called.
    pub fn finish_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl AnomalySink for CollectingSink {
    fn report(&self, report: AnomalyReport) {
        self.reports.lock().push(report);
    }

    fn finish(&self) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_list_json() {
        let report = AnomalyReport {
            batch_pos: 7,
            trace_ids: vec!["a1".to_string(), "b2".to_string()],
        };
        assert_eq!(report.trace_id_list_json(), r#"["a1","b2"]"#);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = AnomalyReport {
            batch_pos: 3,
            trace_ids: vec!["x".to_string()],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"batchPos":3,"traceIds":["x"]}"#);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.report(AnomalyReport {
            batch_pos: 1,
            trace_ids: vec!["b".to_string()],
        });
        sink.report(AnomalyReport {
            batch_pos: 1,
            trace_ids: vec!["a".to_string(), "b".to_string()],
        });
        sink.finish();

        assert_eq!(sink.reports().len(), 2);
        assert_eq!(sink.trace_ids_for(1), vec!["a", "b"]);
        assert!(sink.trace_ids_for(2).is_empty());
        assert_eq!(sink.finish_count(), 1);
    }
}
