//! tailring - Batch Ring for Tail-Based Trace Sampling
//!
//! The client-side buffering substrate of a tail-based sampling pipeline. A
//! line-oriented span log is split across parallel ingestion workers, spans
//! are grouped by trace id into a fixed ring of reusable batch slots, and
//! traces whose tags indicate an error are reported per batch. The decision
//! service later asks for the full span set of suspect traces; the query
//! engine merges spans from the batch and both of its neighbours, so traces
//! straddling a batch boundary come back whole.
//!
//! # Key Features
//!
//! - Per-slot sharded maps, no lock across slots
//! - Disjoint slot sequences per worker (no writer contention)
//! - Park/notify backpressure when a worker laps an unconsumed slot
//! - Three-slot boundary merge with in-order span lists
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tailring::{BatchRing, CollectingSink, Ingestor, MemorySource, QueryEngine, RingConfig};
//!
//! let data = "T1|a|x|x|x|x|x|x|error=1\nT2|b|x|x|x|x|x|x|http.status_code=200\nT1|c\n";
//! let ring = Arc::new(BatchRing::new(RingConfig::new(1, 16, 1000)).unwrap());
//! let sink = CollectingSink::new();
//!
//! Ingestor::new(Arc::clone(&ring)).run(&MemorySource::from(data), &sink).unwrap();
//! assert_eq!(sink.trace_ids_for(0), vec!["T1"]);
//!
//! let spans = QueryEngine::new(ring).query(&["T1"], 0);
//! assert_eq!(spans["T1"].len(), 2);
//! ```

mod backoff;
mod config;
mod error;
mod ingest;
mod invariants;
mod metrics;
mod partition;
mod query;
mod record;
mod ring;
mod sink;
mod source;
mod worker;

pub(crate) use backoff::Backoff;
pub use config::{
    ConfigError, RingConfig, DEFAULT_BATCH_SIZE, DEFAULT_RING_CAPACITY, DEFAULT_WORKER_COUNT,
};
pub use error::{IngestError, QueryError};
pub use ingest::{IngestSummary, Ingestor};
pub use metrics::RingMetrics;
pub use partition::{partition, ByteRange};
pub use query::{QueryEngine, SuspectQuery, TraceSpans};
pub use record::{is_anomalous_tags, SpanRecord, FIELD_DELIMITER, TAGS_FIELD};
pub use ring::{BatchRing, Slot, SpanList};
pub use sink::{AnomalyReport, AnomalySink, CollectingSink, NullSink};
pub use source::{FileSource, MemorySource, SpanSource};
pub use worker::{IngestWorker, WorkerStats};
