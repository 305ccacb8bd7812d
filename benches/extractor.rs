/// Benchmarks for mention extraction.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tweetstats::extractor;

fn criterion_benchmark(c: &mut Criterion) {
    let texts = [
        ("none", "just setting up my twttr, nothing to see here".to_string()),
        ("one", "@jack just setting up my twttr".to_string()),
        (
            "many",
            (0..32).map(|i| format!("@user{i} ")).collect::<String>(),
        ),
    ];
    for (name, text) in texts.iter() {
        c.bench_function(&format!("mentions({})", name), |b| {
            b.iter(|| extractor::mentions(black_box(text)).count())
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
