use criterion::{criterion_group, criterion_main, Criterion};
use lqts::core::job::JobSpec;
use lqts::core::queue::JobQueue;
use lqts::core::resources::CpuResourceManager;
use std::path::PathBuf;

fn spec() -> JobSpec {
    JobSpec::builder(vec!["true".into()], PathBuf::from("/tmp")).build()
}

fn bench_submit(c: &mut Criterion) {
    c.bench_function("queue_submit_1000", |b| {
        b.iter(|| {
            let mut queue = JobQueue::new(10_000);
            for _ in 0..1000 {
                queue.submit(vec![spec()]);
            }
        });
    });
}

fn bench_next_job(c: &mut Criterion) {
    c.bench_function("queue_next_job_1000_candidates", |b| {
        b.iter_batched(
            || {
                let mut queue = JobQueue::new(10_000);
                for _ in 0..1000 {
                    queue.submit(vec![spec()]);
                }
                queue
            },
            |mut queue| {
                queue.next_job();
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_reserve_free(c: &mut Criterion) {
    c.bench_function("cpu_reserve_free_cycle", |b| {
        let mut mgr = CpuResourceManager::new(64);
        b.iter(|| {
            let cores = mgr.reserve(4).unwrap();
            mgr.free(&cores);
        });
    });
}

criterion_group!(benches, bench_submit, bench_next_job, bench_reserve_free);
criterion_main!(benches);
