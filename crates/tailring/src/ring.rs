#[cfg(debug_assertions)]
use crate::invariants::debug_assert_nonempty_spans;
use crate::{Backoff, ConfigError, RingConfig, RingMetrics, SpanRecord};
use crossbeam_utils::CachePadded;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// SLOT LIFECYCLE
// =============================================================================
//
// A slot cycles through: empty → filled by one worker generation → read by
// queries → cleared by the query that consumes it → refilled.
//
// ## Who touches a slot
//
// - Exactly one ingestion worker appends to a slot per generation (slot
//   sequences of different workers are disjoint by construction).
// - Any number of queries read it concurrently with that worker.
// - The query engine clears it, serialized against other queries only.
//
// The trace map is a sharded `DashMap`, so appends, reads and clears contend
// on a shard lock at most; there is no lock across slots.
//
// ## Backpressure
//
// A worker about to reuse a slot waits for `len() == 0`. The `gate` mutex and
// `drained` condvar make that wait lossless: `clear()` empties the map and
// notifies while holding `gate`, and a parked waiter re-checks emptiness
// under `gate` before sleeping, so a clear can't slip between check and park.
// Parks are bounded by the configured poll interval as a safety net.
//
// =============================================================================

/// Ordered raw span lines of one trace within one slot.
pub type SpanList = Vec<Arc<str>>;

/// One reusable ring position: trace id → spans seen in this slot's window.
#[derive(Debug, Default)]
pub struct Slot {
    traces: DashMap<Arc<str>, SpanList>,
    gate: Mutex<()>,
    drained: Condvar,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct traces held.
    #[inline]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Appends a span line to its trace, creating the entry on first sight.
    ///
    /// The entry is created and pushed under one shard lock, so readers never
    /// observe an empty span list.
    pub fn append(&self, trace_id: &Arc<str>, line: Arc<str>) {
        let mut spans = self.traces.entry(Arc::clone(trace_id)).or_default();
        spans.push(line);

        #[cfg(debug_assertions)]
        debug_assert_nonempty_spans!(trace_id, spans.value());
    }

    /// Snapshot of a trace's spans, in insertion order.
    pub fn spans(&self, trace_id: &str) -> Option<SpanList> {
        self.traces.get(trace_id).map(|spans| spans.value().clone())
    }

    /// Trace ids currently held (unordered).
    pub fn trace_ids(&self) -> Vec<Arc<str>> {
        self.traces.iter().map(|entry| Arc::clone(entry.key())).collect()
    }

    /// Total number of span lines across all traces.
    pub fn span_count(&self) -> usize {
        self.traces.iter().map(|entry| entry.value().len()).sum()
    }

    /// Drops every entry and wakes threads waiting for this slot to drain.
    pub fn clear(&self) {
        let _gate = self.gate.lock();
        self.traces.clear();
        self.drained.notify_all();
    }

    /// Blocks until the slot is empty. Returns `true` if the caller had to wait.
    ///
    /// Spins and yields first, then parks for at most `poll_interval` per round.
    /// There is no overall timeout.
    pub fn wait_until_empty(&self, poll_interval: Duration) -> bool {
        if self.is_empty() {
            return false;
        }

        let mut backoff = Backoff::new();
        while !backoff.should_park() {
            backoff.snooze();
            if self.is_empty() {
                return true;
            }
        }

        let mut gate = self.gate.lock();
        while !self.is_empty() {
            self.drained.wait_for(&mut gate, poll_interval);
        }
        true
    }
}

/// Fixed-capacity ring of reusable batch slots.
///
/// Every accessor reduces its slot index modulo the capacity, so callers may
/// pass logical batch positions directly.
pub struct BatchRing {
    slots: Box<[CachePadded<Slot>]>,
    config: RingConfig,
    metrics: RingMetrics,
}

impl BatchRing {
    /// Creates a ring with `config.capacity` empty slots.
    pub fn new(config: RingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let slots = (0..config.capacity)
            .map(|_| CachePadded::new(Slot::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            slots,
            config,
            metrics: RingMetrics::default(),
        })
    }

    /// Creates a ring with the default configuration.
    pub fn with_defaults() -> Self {
        // The default configuration always validates.
        Self {
            slots: (0..RingConfig::default().capacity)
                .map(|_| CachePadded::new(Slot::new()))
                .collect(),
            config: RingConfig::default(),
            metrics: RingMetrics::default(),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> &RingMetrics {
        &self.metrics
    }

    /// Reduces a slot index or logical batch position to a ring index.
    #[inline]
    pub fn index(&self, slot: usize) -> usize {
        slot % self.capacity()
    }

    /// Shared handle to a slot.
    #[inline]
    pub fn get(&self, slot: usize) -> &Slot {
        &self.slots[self.index(slot)]
    }

    /// Number of traces held by a slot.
    #[inline]
    pub fn size(&self, slot: usize) -> usize {
        self.get(slot).len()
    }

    /// Appends a parsed span to its trace in `slot`.
    pub fn append(&self, slot: usize, record: &SpanRecord) {
        self.get(slot).append(&record.trace_id, Arc::clone(&record.line));
        self.metrics.record_append();
    }

    /// Drops all entries of a slot and releases workers waiting to reuse it.
    pub fn clear(&self, slot: usize) {
        self.get(slot).clear();
        self.metrics.record_clear();
    }

    /// Blocks until `slot` has been cleared by its consumer.
    pub fn wait_until_empty(&self, slot: usize) {
        if self.get(slot).wait_until_empty(self.config.poll_interval) {
            self.metrics.record_backpressure_wait();
        }
    }
}
