use thiserror::Error;

/// Failure delivering a report or the completion signal to the decision service.
///
/// These never reach ingestion: the reporter logs them and drops the report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Connection, timeout or other transport-layer failure
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success status
    #[error("decision service returned status {0}")]
    Status(u16),
    /// The request body could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Failure of a full ingest-and-report run.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Ingest(#[from] tailring::IngestError),
    #[error("ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
