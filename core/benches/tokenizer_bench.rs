use criterion::{criterion_group, criterion_main, Criterion};
use shopsearch_core::tokenizer::tokenize;

const DESCRIPTION: &str = "Reusable stainless-steel water bottle with a double-walled, vacuum-insulated body. \
Keeps drinks cold for 24 hours and hot for 12. BPA free, leak-proof lid, fits most cup holders. \
Made in the United States from 18/8 food-grade steel; dishwasher safe (top rack only).";

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_description", |b| b.iter(|| tokenize(DESCRIPTION)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
