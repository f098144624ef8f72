//! Ingestion driver: partitions a source and runs one worker thread per range.

use crate::{
    partition, AnomalySink, BatchRing, IngestError, IngestWorker, SpanSource, WorkerStats,
};
use std::io::BufReader;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a complete ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// Per-worker stats, indexed by worker id
    pub workers: Vec<WorkerStats>,
    pub elapsed: Duration,
}

impl IngestSummary {
    pub fn lines(&self) -> u64 {
        self.workers.iter().map(|w| w.lines).sum()
    }

    pub fn bytes(&self) -> u64 {
        self.workers.iter().map(|w| w.bytes).sum()
    }

    pub fn malformed(&self) -> u64 {
        self.workers.iter().map(|w| w.malformed).sum()
    }

    pub fn reports(&self) -> u64 {
        self.workers.iter().map(|w| w.reports).sum()
    }
}

/// Calls `finish()` on drop, so the completion signal goes out on every exit path.
struct FinishGuard<'a, K: AnomalySink + ?Sized>(&'a K);

impl<K: AnomalySink + ?Sized> Drop for FinishGuard<'_, K> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Runs parallel ingestion of a span source into a shared ring.
pub struct Ingestor {
    ring: Arc<BatchRing>,
}

impl Ingestor {
    pub fn new(ring: Arc<BatchRing>) -> Self {
        Self { ring }
    }

    #[inline]
    pub fn ring(&self) -> &Arc<BatchRing> {
        &self.ring
    }

    /// Ingests the whole source and returns once every worker has finished.
    ///
    /// Blocks without timeout: workers stalled on backpressure keep the run
    /// alive until their slots are cleared. `sink.finish()` is called exactly
    /// once, after all workers are joined, whether the run succeeds or not.
    pub fn run<S, K>(&self, source: &S, sink: &K) -> Result<IngestSummary, IngestError>
    where
        S: SpanSource + ?Sized,
        K: AnomalySink + ?Sized,
    {
        let _finish = FinishGuard(sink);
        let started = Instant::now();

        let len = source.byte_len().map_err(IngestError::SourceLength)?;
        let config = *self.ring.config();
        let ranges = partition(len, config.worker_count);
        tracing::info!(bytes = len, workers = config.worker_count, batch_size = config.batch_size, "starting ingestion");

        // Open every reader before any worker starts, so a bad source leaves the ring untouched.
        let readers = ranges
            .iter()
            .enumerate()
            .map(|(worker, range)| {
                source
                    .open_at(range.lead_in())
                    .map(BufReader::new)
                    .map_err(|source| IngestError::Open { worker, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ring: &BatchRing = &self.ring;
        let results = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(readers.len());
            for (id, (reader, range)) in readers.into_iter().zip(ranges).enumerate() {
                let spawned = thread::Builder::new()
                    .name(format!("ingest-{id}"))
                    .spawn_scoped(scope, move || IngestWorker::new(id, ring, sink).run(reader, range));
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        // Already-spawned workers are joined by the scope before it returns.
                        return vec![Err(IngestError::Spawn(e))];
                    }
                }
            }

            handles
                .into_iter()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(IngestError::WorkerPanicked { worker: id }))
                })
                .collect::<Vec<_>>()
        });

        let mut workers = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(stats) => workers.push(stats),
                Err(e) => {
                    tracing::warn!(error = %e, "ingestion failed");
                    return Err(e);
                }
            }
        }

        let summary = IngestSummary {
            workers,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            lines = summary.lines(),
            bytes = summary.bytes(),
            malformed = summary.malformed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "ingestion complete"
        );
        Ok(summary)
    }
}
