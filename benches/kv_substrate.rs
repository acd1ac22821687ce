use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use unigraph_store::kv::{Database, ReadCtx, WriteCtx};
use unigraph_store::request::{CommitOptions, ReadOptions, ReadTask, ReadWant, WriteOptions, WriteTask};
use unigraph_store::{arena::Arena, core::Config};

fn populate(db: &Database, n: u64) {
    let tasks: Vec<WriteTask> =
        (0..n).map(|k| WriteTask { collection: 0, key: k, value: Some(b"payload-0123456789") }).collect();
    db.write(WriteCtx::Head, &tasks, WriteOptions::default()).unwrap();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("kv_substrate/write");
    for &n in &[1usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("batched", n), &n, |b, &n| {
            b.iter(|| {
                let db = Database::open(Config::default()).unwrap();
                let tasks: Vec<WriteTask> =
                    (0..n as u64).map(|k| WriteTask { collection: 0, key: k, value: Some(b"payload") }).collect();
                db.write(WriteCtx::Head, black_box(&tasks), WriteOptions::default()).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("kv_substrate/read");
    for &n in &[1usize, 64, 1024] {
        let db = Database::open(Config::default()).unwrap();
        populate(&db, n as u64);
        let tasks: Vec<ReadTask> = (0..n as u64).map(|k| ReadTask { collection: 0, key: k }).collect();

        group.bench_with_input(BenchmarkId::new("batched", n), &n, |b, _| {
            b.iter(|| {
                let arena = Arena::new();
                let out = db
                    .read(ReadCtx::Head, black_box(&tasks), ReadWant::all(), ReadOptions::default(), &arena)
                    .unwrap();
                black_box(out.values);
            });
        });
    }
    group.finish();
}

fn bench_txn_commit(c: &mut Criterion) {
    c.bench_function("kv_substrate/txn_commit_single_key", |b| {
        let db = Database::open(Config::default()).unwrap();
        b.iter(|| {
            let mut txn = db.transaction_begin(None);
            db.write(
                WriteCtx::Txn(&mut txn),
                &[WriteTask { collection: 0, key: 1, value: Some(b"v") }],
                WriteOptions::default(),
            )
            .unwrap();
            db.transaction_commit(&mut txn, CommitOptions::default()).unwrap();
        });
    });
}

criterion_group!(benches, bench_write, bench_read, bench_txn_commit);
criterion_main!(benches);
