use crate::error::ReportError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tailring::AnomalyReport;

/// Boxed future returned by [`DecisionClientBoxed`].
pub type ReportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ReportError>> + Send + 'a>>;

/// Remote end that receives anomaly sets and the end-of-stream signal.
///
/// Uses native async fn in traits. The returned futures are not object-safe;
/// for dynamic dispatch go through [`DecisionClientBoxed`].
pub trait DecisionClient: Send + Sync {
    /// Delivers one batch's suspect trace ids.
    fn report_anomalies(
        &self,
        report: &AnomalyReport,
    ) -> impl Future<Output = Result<(), ReportError>> + Send;

    /// Tells the service that ingestion has finished.
    fn notify_finished(&self) -> impl Future<Output = Result<(), ReportError>> + Send;

    /// Returns the client name for logging.
    fn name(&self) -> &str;
}

/// Object-safe twin of [`DecisionClient`].
pub trait DecisionClientBoxed: Send + Sync {
    fn report_anomalies_boxed<'a>(&'a self, report: &'a AnomalyReport) -> ReportFuture<'a>;

    fn notify_finished_boxed(&self) -> ReportFuture<'_>;

    fn name(&self) -> &str;
}

impl<T: DecisionClient> DecisionClientBoxed for T {
    fn report_anomalies_boxed<'a>(&'a self, report: &'a AnomalyReport) -> ReportFuture<'a> {
        Box::pin(self.report_anomalies(report))
    }

    fn notify_finished_boxed(&self) -> ReportFuture<'_> {
        Box::pin(self.notify_finished())
    }

    fn name(&self) -> &str {
        DecisionClient::name(self)
    }
}

/// Decision service reached over HTTP with form-encoded requests.
///
/// Reports go to `POST {base}/setWrongTraceId` with the fields
/// `traceIdListJson` and `batchPos`; completion is `GET {base}/finish`.
#[derive(Debug, Clone)]
pub struct HttpDecisionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDecisionClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Wraps an existing reqwest client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl DecisionClient for HttpDecisionClient {
    async fn report_anomalies(&self, report: &AnomalyReport) -> Result<(), ReportError> {
        let trace_id_list_json = serde_json::to_string(&report.trace_ids)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;
        let batch_pos = report.batch_pos.to_string();

        let resp = self
            .client
            .post(self.endpoint("setWrongTraceId"))
            .form(&[
                ("traceIdListJson", trace_id_list_json.as_str()),
                ("batchPos", batch_pos.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        // Drain body for connection reuse.
        let _ = resp.bytes().await;

        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }

        tracing::debug!(
            batch_pos = report.batch_pos,
            trace_ids = report.trace_ids.len(),
            "reported suspect traces",
        );
        Ok(())
    }

    async fn notify_finished(&self) -> Result<(), ReportError> {
        let resp = self.client.get(self.endpoint("finish")).send().await?;
        let status = resp.status();
        let _ = resp.bytes().await;

        if !status.is_success() {
            return Err(ReportError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// In-process client that records every call.
pub mod recording {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Default)]
    pub struct RecordingClient {
        reports: Mutex<Vec<AnomalyReport>>,
        finished: AtomicUsize,
        fail_batches: Vec<u64>,
        delay: Option<Duration>,
    }

    impl RecordingClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Rejects reports for the given batch positions with a 503.
        pub fn failing_on(mut self, batches: &[u64]) -> Self {
            self.fail_batches = batches.to_vec();
            self
        }

        /// Sleeps before answering each report.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn reports(&self) -> Vec<AnomalyReport> {
            let mut reports = self
                .reports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            reports.sort_by_key(|r| r.batch_pos);
            reports
        }

        pub fn finish_count(&self) -> usize {
            self.finished.load(Ordering::SeqCst)
        }
    }

    impl DecisionClient for RecordingClient {
        async fn report_anomalies(&self, report: &AnomalyReport) -> Result<(), ReportError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_batches.contains(&report.batch_pos) {
                return Err(ReportError::Status(503));
            }
            self.reports
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(report.clone());
            Ok(())
        }

        async fn notify_finished(&self) -> Result<(), ReportError> {
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::recording::RecordingClient;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HttpDecisionClient::with_client(reqwest::Client::new(), "http://localhost:8002/");
        assert_eq!(client.base_url(), "http://localhost:8002");
        assert_eq!(client.endpoint("finish"), "http://localhost:8002/finish");
    }

    #[tokio::test]
    async fn test_boxed_dispatch() {
        let client = Arc::new(RecordingClient::new());
        let boxed: Arc<dyn DecisionClientBoxed> = client.clone();
        let report = AnomalyReport {
            batch_pos: 3,
            trace_ids: vec!["abc".into()],
        };

        boxed.report_anomalies_boxed(&report).await.unwrap();
        boxed.notify_finished_boxed().await.unwrap();

        assert_eq!(boxed.name(), "recording");
        assert_eq!(client.reports(), vec![report]);
        assert_eq!(client.finish_count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = HttpDecisionClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = client.notify_finished().await.unwrap_err();
        assert!(matches!(err, ReportError::Transport(_)), "got {err:?}");
    }
}
