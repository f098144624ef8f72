use crate::error::ClientError;
use crate::reporter::AsyncReporter;
use std::sync::Arc;
use tailring::{BatchRing, IngestSummary, Ingestor, SpanSource};

/// Runs ingestion on a blocking thread, reporting through `reporter`.
///
/// Returns once every worker has joined and the reporter has drained its
/// queue and sent the completion signal. The ring keeps its contents, so
/// suspect queries can still be answered afterwards.
pub async fn ingest_and_report(
    ring: Arc<BatchRing>,
    source: Arc<dyn SpanSource>,
    reporter: Arc<AsyncReporter>,
) -> Result<IngestSummary, ClientError> {
    let sink = Arc::clone(&reporter);
    let outcome = tokio::task::spawn_blocking(move || {
        Ingestor::new(ring).run(source.as_ref(), sink.as_ref())
    })
    .await;

    // Ingestion calls finish() on every path; this waits for delivery.
    reporter.shutdown().await;

    let summary = outcome??;
    tracing::debug!(
        reports = summary.reports(),
        delivered = reporter.metrics().reports_sent(),
        failed = reporter.metrics().report_errors(),
        "reporter drained",
    );
    Ok(summary)
}
