//! Tail-sampling client.
//!
//! Serves suspect queries while ingesting a span log in parallel, reports
//! anomalous trace ids per batch to the decision service, then keeps the
//! query service up until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tail_client::{ingest_and_report, server, AsyncReporter, ClientConfig, HttpDecisionClient};
use tailring::{BatchRing, FileSource, QueryEngine, RingConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tail-client", about)]
struct Cli {
    /// Span log to ingest.
    #[arg(long)]
    data: PathBuf,

    /// Base URL of the decision service.
    #[arg(long, default_value = tail_client::DEFAULT_DECISION_URL)]
    decision_url: String,

    /// Bind address of the suspect-query service.
    #[arg(long, default_value_t = tail_client::DEFAULT_LISTEN_ADDR)]
    listen: SocketAddr,

    /// Logging verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Parallel ingestion workers.
    #[arg(long, default_value_t = tailring::DEFAULT_WORKER_COUNT)]
    workers: usize,

    /// Ring slots; must be a multiple of the worker count.
    #[arg(long, default_value_t = tailring::DEFAULT_RING_CAPACITY)]
    capacity: usize,

    /// Lines per batch.
    #[arg(long, default_value_t = tailring::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Maximum reports in flight to the decision service.
    #[arg(long, default_value_t = 4)]
    max_concurrent_reports: usize,

    /// Stop serving queries as soon as ingestion completes.
    #[arg(long)]
    exit_after_ingest: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level)
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    fmt().with_env_filter(filter).with_target(true).init();

    let ring = RingConfig::new(cli.workers, cli.capacity, cli.batch_size);
    ring.validate().context("invalid ring configuration")?;

    let config = ClientConfig::default()
        .with_decision_url(&cli.decision_url)
        .with_listen_addr(cli.listen)
        .with_ring(ring)
        .with_max_concurrent_reports(cli.max_concurrent_reports);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(run(config, cli.data, cli.exit_after_ingest))
}

async fn run(config: ClientConfig, data: PathBuf, exit_after_ingest: bool) -> Result<()> {
    tracing::info!(
        data = %data.display(),
        decision_url = %config.decision_url,
        workers = config.ring.worker_count,
        capacity = config.ring.capacity,
        batch_size = config.ring.batch_size,
        "starting tail-client",
    );

    let ring = Arc::new(BatchRing::new(config.ring).context("building batch ring")?);
    let engine = Arc::new(QueryEngine::new(Arc::clone(&ring)));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(engine, config.listen_addr, async move {
        let _ = stop_rx.await;
    }));

    let client = HttpDecisionClient::new(&config.decision_url, config.request_timeout)
        .context("building decision client")?;
    let reporter = Arc::new(AsyncReporter::spawn(
        Arc::new(client),
        config.max_concurrent_reports,
    ));

    let source = Arc::new(FileSource::new(&data));
    let summary = ingest_and_report(ring, source, Arc::clone(&reporter))
        .await
        .with_context(|| format!("ingesting {}", data.display()))?;

    tracing::info!(
        lines = summary.lines(),
        reports_sent = reporter.metrics().reports_sent(),
        report_errors = reporter.metrics().report_errors(),
        "ingestion finished",
    );

    if !exit_after_ingest {
        tracing::info!("serving suspect queries until interrupted");
        tokio::signal::ctrl_c()
            .await
            .context("waiting for Ctrl+C")?;
        tracing::info!("received SIGINT, shutting down");
    }

    let _ = stop_tx.send(());
    server
        .await
        .context("query service task")?
        .context("query service")?;

    tracing::info!("tail-client stopped");
    Ok(())
}
