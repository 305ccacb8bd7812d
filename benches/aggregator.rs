/// Benchmarks for the streaming top-K aggregator.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tweetstats::aggregator::{aggregate, MentionTally};
use tweetstats::error::StatsError;
use tweetstats::extractor::MentionExtractor;
use tweetstats::models::Record;

fn records(count: usize, distinct: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            Record::new(
                format!("user{}", i % 97),
                format!("hey @u{} and @u{}", i % distinct, (i * 7) % distinct),
                0,
            )
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    for size_k in [1, 16, 256] {
        let size = size_k * 1024;
        for distinct in [10, 1000, size] {
            let data = records(size, distinct);
            let name = format!("aggregate({}, {})", size, distinct);
            c.bench_function(&name, |b| {
                b.to_async(&runtime).iter(|| async {
                    let stream =
                        tokio_stream::iter(data.iter().cloned().map(Ok::<Record, StatsError>));
                    aggregate(black_box(stream), &MentionExtractor, 10)
                        .await
                        .unwrap()
                })
            });
        }
        let keys: Vec<String> = (0..size).map(|i| format!("u{}", i % 1000)).collect();
        c.bench_function(&format!("tally({})", size), |b| {
            b.iter(|| {
                let mut tally = MentionTally::new();
                for key in keys.iter() {
                    tally.observe(black_box(key));
                }
                tally.into_ranked(10)
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
