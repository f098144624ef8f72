//! Boundary query engine: recovers suspect traces from a slot and its neighbours.
//!
//! A trace's spans can land on both sides of a batch boundary (the tail of one
//! batch and the head of the next). Scanning the previous, current and next
//! slots recovers the whole trace as long as no trace spans more than one full
//! batch width.

#[cfg(debug_assertions)]
use crate::invariants::debug_assert_nonempty_spans;
use crate::{BatchRing, QueryError, SpanList};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Merged spans per suspect trace. Suspects with no spans are absent.
pub type TraceSpans = HashMap<String, SpanList>;

/// Suspect trace ids plus the batch position the caller considers current.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspectQuery {
    pub trace_ids: Vec<String>,
    pub batch_pos: u64,
}

impl SuspectQuery {
    /// Decodes the wire form: a JSON array of trace ids and a signed batch position.
    pub fn from_wire(trace_id_list_json: &str, batch_pos: i64) -> Result<Self, QueryError> {
        let batch_pos = u64::try_from(batch_pos).map_err(|_| QueryError::NegativeBatchPos(batch_pos))?;
        let trace_ids = serde_json::from_str(trace_id_list_json)?;
        Ok(Self { trace_ids, batch_pos })
    }
}

/// Serializes query execution and frees consumed slots.
///
/// Only one query runs at a time; this is the only lock spanning several slots.
/// Ingestion is not blocked by it, so reads of the current and next slot are a
/// best-effort snapshot of whatever has been appended so far.
pub struct QueryEngine {
    ring: Arc<BatchRing>,
    serial: Mutex<()>,
}

impl QueryEngine {
    pub fn new(ring: Arc<BatchRing>) -> Self {
        Self {
            ring,
            serial: Mutex::new(()),
        }
    }

    #[inline]
    pub fn ring(&self) -> &Arc<BatchRing> {
        &self.ring
    }

    /// Slots scanned for `batch_pos`, in scan order: previous, current, next.
    ///
    /// Duplicates (rings of capacity 1 or 2) are scanned once.
    pub fn neighbourhood(&self, batch_pos: u64) -> (usize, Vec<usize>) {
        let capacity = self.ring.capacity();
        let pos = (batch_pos % capacity as u64) as usize;
        let previous = (pos + capacity - 1) % capacity;
        let next = (pos + 1) % capacity;

        let mut order = Vec::with_capacity(3);
        for slot in [previous, pos, next] {
            if !order.contains(&slot) {
                order.push(slot);
            }
        }
        (previous, order)
    }

    /// Gathers the spans of every suspect from the slots around `batch_pos`,
    /// then clears the previous slot.
    ///
    /// Per trace, spans from the previous slot precede those of the current
    /// slot, which precede those of the next. Duplicate suspect ids are looked
    /// up once.
    pub fn query<S: AsRef<str>>(&self, trace_ids: &[S], batch_pos: u64) -> TraceSpans {
        let (previous, scan) = self.neighbourhood(batch_pos);
        let mut seen = HashSet::with_capacity(trace_ids.len());
        let suspects: Vec<&str> = trace_ids
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| seen.insert(*id))
            .collect();

        let mut merged = TraceSpans::new();
        let _serial = self.serial.lock();

        for slot in scan {
            let traces = self.ring.get(slot);
            for &trace_id in &suspects {
                let Some(spans) = traces.spans(trace_id) else {
                    continue;
                };

                #[cfg(debug_assertions)]
                debug_assert_nonempty_spans!(trace_id, spans);

                tracing::debug!(batch_pos, slot, trace_id, spans = spans.len(), "suspect trace found");
                merged.entry(trace_id.to_string()).or_default().extend(spans);
            }
        }

        self.ring.clear(previous);
        self.ring.metrics().record_query();
        tracing::debug!(batch_pos, cleared = previous, matched = merged.len(), suspects = suspects.len(), "suspect query served");

        merged
    }

    /// Runs a [`SuspectQuery`].
    pub fn answer(&self, query: &SuspectQuery) -> TraceSpans {
        self.query(&query.trace_ids, query.batch_pos)
    }

    /// Wire-level entry point: decodes the request, runs it, encodes the result as JSON.
    pub fn query_json(&self, trace_id_list_json: &str, batch_pos: i64) -> Result<String, QueryError> {
        let query = SuspectQuery::from_wire(trace_id_list_json, batch_pos)?;
        let merged = self.answer(&query);
        serde_json::to_string(&merged).map_err(QueryError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RingConfig, SpanRecord};

    fn engine(capacity: usize) -> QueryEngine {
        QueryEngine::new(Arc::new(BatchRing::new(RingConfig::new(1, capacity, 10)).unwrap()))
    }

    fn put(engine: &QueryEngine, slot: usize, line: &str) {
        engine.ring().append(slot, &SpanRecord::parse(line).unwrap());
    }

    fn lines(spans: &SpanList) -> Vec<&str> {
        spans.iter().map(AsRef::as_ref).collect()
    }

    #[test]
    fn test_neighbourhood_wraps() {
        let engine = engine(16);
        assert_eq!(engine.neighbourhood(0), (15, vec![15, 0, 1]));
        assert_eq!(engine.neighbourhood(15), (14, vec![14, 15, 0]));
        assert_eq!(engine.neighbourhood(33), (0, vec![0, 1, 2]));
    }

    #[test]
    fn test_neighbourhood_small_rings() {
        assert_eq!(engine(1).neighbourhood(5), (0, vec![0]));
        assert_eq!(engine(2).neighbourhood(1), (0, vec![0, 1]));
    }

    #[test]
    fn test_merges_in_scan_order_and_clears_previous() {
        let engine = engine(8);
        put(&engine, 2, "T1|prev");
        put(&engine, 3, "T1|cur");
        put(&engine, 4, "T1|next");
        put(&engine, 3, "T2|cur");
        put(&engine, 5, "T1|outside");

        let merged = engine.query(&["T1", "T2", "T9"], 3);

        assert_eq!(lines(&merged["T1"]), vec!["T1|prev", "T1|cur", "T1|next"]);
        assert_eq!(lines(&merged["T2"]), vec!["T2|cur"]);
        assert!(!merged.contains_key("T9"));

        assert_eq!(engine.ring().size(2), 0, "previous slot must be cleared");
        assert_eq!(engine.ring().size(3), 2);
        assert_eq!(engine.ring().size(4), 1);
        assert_eq!(engine.ring().metrics().queries_served(), 1);
    }

    #[test]
    fn test_duplicate_suspects_counted_once() {
        let engine = engine(4);
        put(&engine, 1, "T1|a");
        let merged = engine.query(&["T1", "T1"], 1);
        assert_eq!(lines(&merged["T1"]), vec!["T1|a"]);
    }

    #[test]
    fn test_query_leaves_slot_contents_intact() {
        let engine = engine(4);
        put(&engine, 1, "T1|a");
        let mut merged = engine.query(&["T1"], 1);
        merged.get_mut("T1").unwrap().push(Arc::from("T1|local"));
        assert_eq!(engine.ring().get(1).spans("T1").unwrap().len(), 1);
    }

    #[test]
    fn test_query_json_round_trip() {
        let engine = engine(4);
        put(&engine, 0, "T1|a");
        let json = engine.query_json(r#"["T1","T2"]"#, 0).unwrap();
        let decoded: HashMap<String, Vec<String>> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["T1"], vec!["T1|a"]);
    }

    #[test]
    fn test_query_json_rejects_bad_input() {
        let engine = engine(4);
        assert!(matches!(
            engine.query_json("not json", 0),
            Err(QueryError::InvalidTraceIdList(_))
        ));
        assert!(matches!(
            engine.query_json("[]", -1),
            Err(QueryError::NegativeBatchPos(-1))
        ));
    }
}
