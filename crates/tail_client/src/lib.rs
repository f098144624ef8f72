//! Async shell around [`tailring`].
//!
//! Wires the synchronous ingestion core to the outside world: anomaly sets
//! are forwarded to a decision service by an [`AsyncReporter`], and the
//! service's suspect queries are answered over HTTP by [`server::router`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tail_client::{ingest_and_report, AsyncReporter, ClientConfig, HttpDecisionClient};
//! use tailring::{BatchRing, FileSource, QueryEngine};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let ring = Arc::new(BatchRing::new(config.ring)?);
//! let engine = Arc::new(QueryEngine::new(Arc::clone(&ring)));
//! tokio::spawn(tail_client::server::serve(engine, config.listen_addr, std::future::pending()));
//!
//! let client = Arc::new(HttpDecisionClient::new(&config.decision_url, config.request_timeout)?);
//! let reporter = Arc::new(AsyncReporter::spawn(client, config.max_concurrent_reports));
//! let summary = ingest_and_report(ring, Arc::new(FileSource::new("trace1.data")), reporter).await?;
//! println!("{} lines", summary.lines());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod reporter;
pub mod server;

pub use client::{DecisionClient, DecisionClientBoxed, HttpDecisionClient, ReportFuture};
pub use config::{ClientConfig, DEFAULT_DECISION_URL, DEFAULT_LISTEN_ADDR};
pub use error::{ClientError, ReportError};
pub use pipeline::ingest_and_report;
pub use reporter::{AsyncReporter, ReportMetrics};
