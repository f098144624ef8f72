//! Ingestion worker: reads one byte range and fills its own sequence of slots.

#[cfg(debug_assertions)]
use crate::invariants::{debug_assert_owned_batch, debug_assert_slot_drained};
use crate::{AnomalyReport, AnomalySink, BatchRing, ByteRange, IngestError, SpanRecord};
use std::collections::HashSet;
use std::io::BufRead;
use std::sync::Arc;

/// Counters reported by a worker when its range is exhausted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker: usize,
    /// Lines processed, malformed ones included
    pub lines: u64,
    pub bytes: u64,
    /// Lines skipped because they didn't parse
    pub malformed: u64,
    /// Batch boundaries crossed
    pub batches: u64,
    /// Anomaly reports handed to the sink
    pub reports: u64,
}

/// One ingestion worker.
///
/// Worker `w` of `n` fills logical batches `w, w+n, w+2n, ...`; batch `b` lives
/// in slot `b mod capacity`. Because the capacity is a multiple of `n`, no two
/// workers ever share a slot.
pub struct IngestWorker<'a, K: AnomalySink + ?Sized> {
    id: usize,
    ring: &'a BatchRing,
    sink: &'a K,
    batch_pos: u64,
    anomalies: HashSet<Arc<str>>,
    stats: WorkerStats,
}

impl<'a, K: AnomalySink + ?Sized> IngestWorker<'a, K> {
    /// Creates worker `id`, positioned on its first slot.
    pub fn new(id: usize, ring: &'a BatchRing, sink: &'a K) -> Self {
        Self {
            id,
            ring,
            sink,
            batch_pos: id as u64,
            anomalies: HashSet::new(),
            stats: WorkerStats {
                worker: id,
                ..WorkerStats::default()
            },
        }
    }

    /// Logical position of the batch currently being filled.
    #[inline]
    pub fn batch_pos(&self) -> u64 {
        self.batch_pos
    }

    /// Ring slot currently being filled.
    #[inline]
    pub fn slot(&self) -> usize {
        self.ring.index(self.batch_pos as usize)
    }

    /// Reads every line that starts inside `range` and returns the final stats.
    ///
    /// `reader` must be positioned at [`ByteRange::lead_in`]: for a range that
    /// doesn't start at 0 the worker first discards the remainder of the line
    /// straddling `range.start`, which belongs to the previous worker. The last
    /// line starting before `range.end` is read to its end.
    pub fn run<R: BufRead>(mut self, mut reader: R, range: ByteRange) -> Result<WorkerStats, IngestError> {
        tracing::info!(worker = self.id, start = range.start, end = range.end, "ingestion worker started");

        let mut buf = Vec::with_capacity(512);
        let mut pos = range.lead_in();
        if range.start > 0 {
            pos += self.read_line(&mut reader, &mut buf)? as u64;
        }

        while pos < range.end {
            let n = self.read_line(&mut reader, &mut buf)?;
            if n == 0 {
                break;
            }
            pos += n as u64;
            self.stats.bytes += n as u64;
            match std::str::from_utf8(&buf) {
                Ok(line) => self.ingest_line(line),
                Err(_) => self.skip_malformed(),
            }
        }

        let stats = self.finish();
        tracing::info!(
            worker = stats.worker,
            lines = stats.lines,
            bytes = stats.bytes,
            malformed = stats.malformed,
            batches = stats.batches,
            "ingestion worker finished"
        );
        Ok(stats)
    }

    fn read_line<R: BufRead>(&self, reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, IngestError> {
        buf.clear();
        reader.read_until(b'\n', buf).map_err(|source| IngestError::Read {
            worker: self.id,
            source,
        })
    }

    /// Processes one raw line and advances to the next slot at batch boundaries.
    pub fn ingest_line(&mut self, raw: &str) {
        match SpanRecord::parse(raw) {
            Some(record) => {
                self.ring.append(self.slot(), &record);
                if record.anomalous {
                    self.anomalies.insert(record.trace_id);
                }
                self.count_line();
            }
            None => self.skip_malformed(),
        }
    }

    fn skip_malformed(&mut self) {
        self.stats.malformed += 1;
        tracing::trace!(worker = self.id, batch_pos = self.batch_pos, "skipping malformed span line");
        self.count_line();
    }

    fn count_line(&mut self) {
        self.stats.lines += 1;
        if self.stats.lines % self.ring.config().batch_size as u64 == 0 {
            self.advance();
        }
    }

    /// Moves to the next slot of this worker's sequence.
    ///
    /// Waits for that slot's previous generation to be cleared, reports the
    /// anomaly set of the batch being left, then starts a fresh set.
    fn advance(&mut self) {
        let workers = self.ring.config().worker_count as u64;
        let next_pos = self.batch_pos + workers;
        let next_slot = self.ring.index(next_pos as usize);

        if self.ring.size(next_slot) > 0 {
            tracing::debug!(worker = self.id, slot = next_slot, "next slot still occupied, waiting for it to drain");
        }
        self.ring.wait_until_empty(next_slot);

        #[cfg(debug_assertions)]
        debug_assert_slot_drained!(self.ring, next_slot);

        self.report();
        tracing::debug!(worker = self.id, from = self.batch_pos, to = next_pos, slot = next_slot, "advanced to next batch");

        self.batch_pos = next_pos;
        self.stats.batches += 1;

        #[cfg(debug_assertions)]
        debug_assert_owned_batch!(self.id as u64, workers, self.batch_pos);
    }

    fn report(&mut self) {
        if self.anomalies.is_empty() {
            return;
        }
        let mut trace_ids: Vec<String> = self.anomalies.drain().map(|id| id.to_string()).collect();
        trace_ids.sort_unstable();
        tracing::debug!(worker = self.id, batch_pos = self.batch_pos, count = trace_ids.len(), "reporting suspect traces");
        self.sink.report(AnomalyReport {
            batch_pos: self.batch_pos,
            trace_ids,
        });
        self.stats.reports += 1;
    }

    /// Ends ingestion, flushing the partial batch's anomaly set if configured.
    pub fn finish(mut self) -> WorkerStats {
        if self.ring.config().report_partial_batch {
            self.report();
        } else if !self.anomalies.is_empty() {
            tracing::debug!(
                worker = self.id,
                batch_pos = self.batch_pos,
                dropped = self.anomalies.len(),
                "discarding anomaly set of final partial batch"
            );
        }
        self.stats
    }
}
