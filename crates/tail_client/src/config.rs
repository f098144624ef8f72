use std::net::SocketAddr;
use std::time::Duration;
use tailring::RingConfig;

/// Base URL of the decision service in the reference deployment.
pub const DEFAULT_DECISION_URL: &str = "http://localhost:8002";

/// Address the suspect-query service binds to by default.
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8000);

/// Configuration for the async client shell.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the decision service (no trailing slash)
    pub decision_url: String,
    /// Bind address of the suspect-query HTTP service
    pub listen_addr: SocketAddr,
    /// Ring, worker and batch sizing
    pub ring: RingConfig,
    /// Maximum reports in flight to the decision service
    pub max_concurrent_reports: usize,
    /// Per-request timeout for decision-service calls
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn with_decision_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.decision_url = url.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_ring(mut self, ring: RingConfig) -> Self {
        self.ring = ring;
        self
    }

    pub fn with_max_concurrent_reports(mut self, max: usize) -> Self {
        self.max_concurrent_reports = max.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            decision_url: DEFAULT_DECISION_URL.to_owned(),
            listen_addr: DEFAULT_LISTEN_ADDR,
            ring: RingConfig::default(),
            max_concurrent_reports: 4,
            request_timeout: Duration::from_secs(5),
        }
    }
}
