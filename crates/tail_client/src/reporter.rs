//! Bridge from synchronous ingestion threads to the async decision client.
//!
//! Workers hand reports to [`AsyncReporter::report`], which only enqueues.
//! A consumer task dispatches every report on its own task, bounded by a
//! semaphore. Failures are logged and dropped: delivery is at-most-once.

use crate::client::DecisionClientBoxed;
use crate::error::ReportError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tailring::{AnomalyReport, AnomalySink};
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

/// Delivery counters, updated from concurrent report tasks.
#[derive(Debug, Default)]
pub struct ReportMetrics {
    reports_sent: AtomicU64,
    trace_ids_sent: AtomicU64,
    report_errors: AtomicU64,
    inflight_reports: AtomicU64,
    finish_sent: AtomicU64,
}

impl ReportMetrics {
    pub fn reports_sent(&self) -> u64 {
        self.reports_sent.load(Ordering::Relaxed)
    }

    pub fn trace_ids_sent(&self) -> u64 {
        self.trace_ids_sent.load(Ordering::Relaxed)
    }

    pub fn report_errors(&self) -> u64 {
        self.report_errors.load(Ordering::Relaxed)
    }

    pub fn inflight_reports(&self) -> u64 {
        self.inflight_reports.load(Ordering::Relaxed)
    }

    /// Number of completion signals delivered (0 or 1).
    pub fn finish_sent(&self) -> u64 {
        self.finish_sent.load(Ordering::Relaxed)
    }

    fn record_success(&self, trace_ids: u64) {
        self.reports_sent.fetch_add(1, Ordering::Relaxed);
        self.trace_ids_sent.fetch_add(trace_ids, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.report_errors.fetch_add(1, Ordering::Relaxed);
    }
}

enum Event {
    Report(AnomalyReport),
    Finish,
}

/// [`AnomalySink`] that forwards to a [`DecisionClientBoxed`] from a tokio task.
///
/// Must be created inside a tokio runtime. `report` and `finish` are safe to
/// call from any thread, including non-runtime ingestion threads.
pub struct AsyncReporter {
    tx: mpsc::UnboundedSender<Event>,
    finishing: AtomicBool,
    consumer: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<ReportMetrics>,
}

impl AsyncReporter {
    /// Spawns the consumer task on the current runtime.
    pub fn spawn(client: Arc<dyn DecisionClientBoxed>, max_concurrent_reports: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(ReportMetrics::default());
        let consumer = tokio::spawn(consume(
            rx,
            client,
            Arc::clone(&metrics),
            max_concurrent_reports.max(1),
        ));

        Self {
            tx,
            finishing: AtomicBool::new(false),
            consumer: Mutex::new(Some(consumer)),
            metrics,
        }
    }

    pub fn metrics(&self) -> &ReportMetrics {
        &self.metrics
    }

    /// Waits until every queued report has been attempted and the completion
    /// signal has been sent. Triggers completion if ingestion has not.
    pub async fn shutdown(&self) {
        self.finish();
        if let Some(consumer) = self.consumer.lock().await.take() {
            if let Err(e) = consumer.await {
                tracing::error!(error = %e, "reporter task panicked");
            }
        }
    }
}

impl AnomalySink for AsyncReporter {
    fn report(&self, report: AnomalyReport) {
        if self.finishing.load(Ordering::Acquire) {
            tracing::warn!(batch_pos = report.batch_pos, "report after finish dropped");
            return;
        }
        if self.tx.send(Event::Report(report)).is_err() {
            tracing::warn!("reporter task gone, report dropped");
        }
    }

    fn finish(&self) {
        if !self.finishing.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(Event::Finish);
        }
    }
}

async fn consume(
    mut rx: mpsc::UnboundedReceiver<Event>,
    client: Arc<dyn DecisionClientBoxed>,
    metrics: Arc<ReportMetrics>,
    max_concurrent: usize,
) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut tasks: JoinSet<()> = JoinSet::new();

    while let Some(event) = rx.recv().await {
        // Reap finished tasks so the set doesn't grow with the stream.
        while let Some(joined) = tasks.try_join_next() {
            log_join(joined);
        }

        match event {
            Event::Report(report) => {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let client = Arc::clone(&client);
                let metrics = Arc::clone(&metrics);
                metrics.inflight_reports.fetch_add(1, Ordering::Relaxed);

                tasks.spawn(async move {
                    deliver(client.as_ref(), &report, &metrics).await;
                    metrics.inflight_reports.fetch_sub(1, Ordering::Relaxed);
                    drop(permit);
                });
            }
            Event::Finish => {
                while let Some(joined) = tasks.join_next().await {
                    log_join(joined);
                }
                match client.notify_finished_boxed().await {
                    Ok(()) => {
                        metrics.finish_sent.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(
                            client = client.name(),
                            reports = metrics.reports_sent(),
                            errors = metrics.report_errors(),
                            "completion signal sent",
                        );
                    }
                    Err(e) => {
                        tracing::warn!(client = client.name(), error = %e, "completion signal failed");
                    }
                }
                return;
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }
}

async fn deliver(client: &dyn DecisionClientBoxed, report: &AnomalyReport, metrics: &ReportMetrics) {
    match client.report_anomalies_boxed(report).await {
        Ok(()) => metrics.record_success(report.trace_ids.len() as u64),
        Err(e) => {
            metrics.record_error();
            log_failure(client.name(), report, &e);
        }
    }
}

fn log_failure(client: &str, report: &AnomalyReport, err: &ReportError) {
    tracing::warn!(
        client,
        batch_pos = report.batch_pos,
        trace_ids = report.trace_ids.len(),
        error = %err,
        "anomaly report dropped",
    );
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "report task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::recording::RecordingClient;
    use std::time::Duration;

    fn report(batch_pos: u64, ids: &[&str]) -> AnomalyReport {
        AnomalyReport {
            batch_pos,
            trace_ids: ids.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn test_reports_delivered_before_finish() {
        let client = Arc::new(RecordingClient::new().with_delay(Duration::from_millis(5)));
        let reporter = AsyncReporter::spawn(client.clone(), 2);

        for pos in 0..10 {
            reporter.report(report(pos, &["a", "b"]));
        }
        reporter.shutdown().await;

        assert_eq!(client.reports().len(), 10);
        assert_eq!(client.finish_count(), 1);
        assert_eq!(reporter.metrics().reports_sent(), 10);
        assert_eq!(reporter.metrics().trace_ids_sent(), 20);
        assert_eq!(reporter.metrics().inflight_reports(), 0);
    }

    #[tokio::test]
    async fn test_failed_report_is_dropped_not_retried() {
        let client = Arc::new(RecordingClient::new().failing_on(&[1]));
        let reporter = AsyncReporter::spawn(client.clone(), 4);

        reporter.report(report(0, &["a"]));
        reporter.report(report(1, &["b"]));
        reporter.report(report(2, &["c"]));
        reporter.shutdown().await;

        let delivered: Vec<u64> = client.reports().iter().map(|r| r.batch_pos).collect();
        assert_eq!(delivered, vec![0, 2]);
        assert_eq!(reporter.metrics().report_errors(), 1);
        assert_eq!(client.finish_count(), 1);
    }

    #[tokio::test]
    async fn test_finish_sent_once() {
        let client = Arc::new(RecordingClient::new());
        let reporter = AsyncReporter::spawn(client.clone(), 1);

        reporter.finish();
        reporter.finish();
        reporter.shutdown().await;
        reporter.shutdown().await;

        assert_eq!(client.finish_count(), 1);
        assert_eq!(reporter.metrics().finish_sent(), 1);
    }

    #[tokio::test]
    async fn test_report_after_finish_ignored() {
        let client = Arc::new(RecordingClient::new());
        let reporter = AsyncReporter::spawn(client.clone(), 1);

        reporter.finish();
        reporter.report(report(7, &["late"]));
        reporter.shutdown().await;

        assert!(client.reports().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reports_from_plain_threads() {
        let client = Arc::new(RecordingClient::new());
        let reporter = Arc::new(AsyncReporter::spawn(client.clone(), 4));

        let handles: Vec<_> = (0..4u64)
            .map(|w| {
                let reporter = Arc::clone(&reporter);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        reporter.report(report(w + i * 4, &["x"]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        reporter.shutdown().await;

        let positions: Vec<u64> = client.reports().iter().map(|r| r.batch_pos).collect();
        assert_eq!(positions, (0..100).collect::<Vec<_>>());
    }
}
