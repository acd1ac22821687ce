use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use unigraph_store::document::gather::{ColumnSpec, DesiredType};
use unigraph_store::kv::{Database, EngineCtx};
use unigraph_store::{core::Config, DocumentEngine, DocumentFormat, DocumentWriteTask};

fn populate(db: &Database, n: u64) {
    let payload = br#"{"name":"widget","price":"19.99","qty":3,"tags":["a","b","c"]}"#;
    let engine = DocumentEngine::new(db);
    for key in 0..n {
        engine
            .write(
                EngineCtx::Head,
                &[DocumentWriteTask { collection: 0, key, field: None, payload, format: DocumentFormat::Json }],
            )
            .unwrap();
    }
}

fn bench_gather(c: &mut Criterion) {
    let mut group = c.benchmark_group("gather/columnar_projection");
    let headers = vec![
        ColumnSpec { field: "/name".to_string(), desired: DesiredType::String },
        ColumnSpec { field: "/price".to_string(), desired: DesiredType::F64 },
        ColumnSpec { field: "/qty".to_string(), desired: DesiredType::I32 },
    ];

    for &n in &[1usize, 64, 1024] {
        let db = Database::open(Config::default()).unwrap();
        populate(&db, n as u64);
        let engine = DocumentEngine::new(&db);
        let refs: Vec<(u64, u64)> = (0..n as u64).map(|k| (0, k)).collect();

        group.bench_with_input(BenchmarkId::new("rows", n), &n, |b, _| {
            b.iter(|| {
                let columns = engine.gather(EngineCtx::Head, black_box(&refs), black_box(&headers)).unwrap();
                black_box(columns);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gather);
criterion_main!(benches);
