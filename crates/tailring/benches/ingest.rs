use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tailring::{BatchRing, Ingestor, MemorySource, NullSink, QueryEngine, RingConfig};

const LINES: usize = 200_000;
const TRACES: usize = 4_000;

fn span_data() -> MemorySource {
    let mut data = String::with_capacity(LINES * 96);
    for i in 0..LINES {
        let tags = if i % 997 == 0 {
            "http.status_code=500&component=db"
        } else {
            "http.status_code=200&component=web"
        };
        data.push_str(&format!(
            "{:016x}|1590000000{:06}|{:x}|0|812|svc|GET|192.168.0.1|{tags}\n",
            i % TRACES,
            i,
            i
        ));
    }
    MemorySource::from(data)
}

fn bench_ingest(c: &mut Criterion) {
    let source = span_data();
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(LINES as u64));

    for workers in [1usize, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(format!("{workers}W")), &workers, |b, &w| {
            b.iter(|| {
                // one batch per worker keeps backpressure out of the measurement
                let config = RingConfig::new(w, 16, LINES);
                let ring = Arc::new(BatchRing::new(config).unwrap());
                let summary = Ingestor::new(ring).run(&source, &NullSink).unwrap();
                black_box(summary.lines());
            });
        });
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let source = span_data();
    let suspects: Vec<String> = (0..TRACES).step_by(40).map(|t| format!("{t:016x}")).collect();

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(suspects.len() as u64));

    group.bench_function("neighbourhood_scan", |b| {
        b.iter_batched(
            || {
                let ring = Arc::new(BatchRing::new(RingConfig::new(2, 16, LINES)).unwrap());
                Ingestor::new(Arc::clone(&ring)).run(&source, &NullSink).unwrap();
                QueryEngine::new(ring)
            },
            |engine| black_box(engine.query(&suspects, 1)),
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_ingest, bench_query);
criterion_main!(benches);
