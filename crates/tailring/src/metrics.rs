use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for ring activity, shared by workers and the query engine.
#[derive(Debug, Default)]
pub struct RingMetrics {
    spans_appended: AtomicU64,
    slots_cleared: AtomicU64,
    backpressure_waits: AtomicU64,
    queries_served: AtomicU64,
}

impl RingMetrics {
    pub fn spans_appended(&self) -> u64 {
        self.spans_appended.load(Ordering::Relaxed)
    }

    pub fn slots_cleared(&self) -> u64 {
        self.slots_cleared.load(Ordering::Relaxed)
    }

    /// Times a worker found its next slot still occupied and had to wait.
    pub fn backpressure_waits(&self) -> u64 {
        self.backpressure_waits.load(Ordering::Relaxed)
    }

    pub fn queries_served(&self) -> u64 {
        self.queries_served.load(Ordering::Relaxed)
    }

    pub(crate) fn record_append(&self) {
        self.spans_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_clear(&self) {
        self.slots_cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_backpressure_wait(&self) {
        self.backpressure_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
    }
}
