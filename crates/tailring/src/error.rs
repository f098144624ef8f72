use std::io;
use thiserror::Error;

/// Fatal ingestion failures. Any of these fails the whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The stream length could not be determined, so it can't be partitioned.
    #[error("failed to determine source length: {0}")]
    SourceLength(#[source] io::Error),
    #[error("worker {worker} failed to open its reader: {source}")]
    Open {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("worker {worker} failed while reading: {source}")]
    Read {
        worker: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn ingestion thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Rejected suspect query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("trace id list is not a JSON array of strings: {0}")]
    InvalidTraceIdList(#[from] serde_json::Error),
    #[error("batch position must not be negative, got {0}")]
    NegativeBatchPos(i64),
    #[error("failed to encode query result: {0}")]
    Encode(#[source] serde_json::Error),
}
