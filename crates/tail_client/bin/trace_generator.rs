//! Synthetic span log generator.
//!
//! Writes pipe-delimited span lines in the layout the client ingests:
//! `traceId|startTime|spanId|parentSpanId|duration|serviceName|spanName|host|tags`.
//! Spans of a trace are interleaved with other traces, and a configurable
//! share of traces carries `error=1` or a non-200 status code.
//!
//! Run with: `cargo run --bin trace_generator -- --out trace1.data --traces 10000`

use anyhow::{Context, Result};
use clap::Parser;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

const SERVICES: &[&str] = &["frontend", "checkout", "payment", "inventory", "shipping"];
const OPERATIONS: &[&str] = &["GET /cart", "POST /order", "db.query", "rpc.call", "cache.get"];
const ERROR_STATUSES: &[u16] = &[400, 403, 404, 500, 502, 503];

#[derive(Parser)]
#[command(name = "trace_generator", about)]
struct Cli {
    /// Output file.
    #[arg(long)]
    out: PathBuf,

    /// Number of traces to generate.
    #[arg(long, default_value_t = 10_000)]
    traces: usize,

    /// Maximum spans per trace.
    #[arg(long, default_value_t = 12)]
    max_spans: usize,

    /// Fraction of traces containing an anomalous span.
    #[arg(long, default_value_t = 0.02)]
    error_ratio: f64,

    /// Traces in flight at once; controls how far a trace's spans spread.
    #[arg(long, default_value_t = 64)]
    window: usize,

    /// RNG seed for reproducible output.
    #[arg(long)]
    seed: Option<u64>,
}

struct TraceState {
    trace_id: String,
    remaining: usize,
    next_span: u64,
    faulty_span: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let file = File::create(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;
    let mut out = BufWriter::new(file);

    let mut started = 0usize;
    let window = cli.window.max(1);
    let mut active: Vec<TraceState> = Vec::with_capacity(window);
    let mut clock: u64 = 1_589_285_985_482_000;
    let mut spans = 0u64;
    let mut faulty = 0u64;

    while started < cli.traces || !active.is_empty() {
        while active.len() < window && started < cli.traces {
            let len = rng.gen_range(1..=cli.max_spans.max(1));
            let faulty_span = rng.gen_bool(cli.error_ratio.clamp(0.0, 1.0)).then(|| rng.gen_range(0..len));
            faulty += u64::from(faulty_span.is_some());
            active.push(TraceState {
                trace_id: format!("{:x}", rng.gen::<u64>()),
                remaining: len,
                next_span: 0,
                faulty_span,
            });
            started += 1;
        }

        let idx = rng.gen_range(0..active.len());
        let trace = &mut active[idx];
        let emitted = trace.next_span as usize;
        let tags = if trace.faulty_span == Some(emitted) {
            anomalous_tags(&mut rng)
        } else {
            "http.status_code=200&component=java-web-servlet".to_owned()
        };

        clock += rng.gen_range(1..500);
        writeln!(
            out,
            "{}|{}|{:x}|{}|{}|{}|{}|192.168.{}.{}|{}",
            trace.trace_id,
            clock,
            rng.gen::<u32>(),
            if emitted == 0 { "0".to_owned() } else { format!("{:x}", rng.gen::<u32>()) },
            rng.gen_range(1..2_000),
            SERVICES.choose(&mut rng).copied().unwrap_or("frontend"),
            OPERATIONS.choose(&mut rng).copied().unwrap_or("rpc.call"),
            rng.gen_range(0..8),
            rng.gen_range(1..255),
            tags,
        )?;
        spans += 1;

        trace.next_span += 1;
        trace.remaining -= 1;
        if trace.remaining == 0 {
            active.swap_remove(idx);
        }
    }

    out.flush()?;
    println!(
        "wrote {} spans across {} traces ({} anomalous) to {}",
        spans,
        cli.traces,
        faulty,
        cli.out.display()
    );
    Ok(())
}

fn anomalous_tags(rng: &mut StdRng) -> String {
    if rng.gen_bool(0.5) {
        "error=1&component=db".to_owned()
    } else {
        let status = ERROR_STATUSES.choose(rng).copied().unwrap_or(500);
        format!("http.status_code={status}&component=java-web-servlet")
    }
}
