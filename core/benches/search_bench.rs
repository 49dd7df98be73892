use criterion::{criterion_group, criterion_main, Criterion};
use shopsearch_core::index::build;
use shopsearch_core::{Document, IndexStore, SearchConfig, SearchEngine, SynonymTable};

const ADJECTIVES: &[&str] = &["organic", "stainless", "cotton", "leather", "gaming", "reusable", "black", "wireless"];
const NOUNS: &[&str] = &["coffee", "bottle", "shirt", "wallet", "laptop", "keyboard", "shoes", "candy"];

fn corpus(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let adj = ADJECTIVES[i % ADJECTIVES.len()];
            let noun = NOUNS[(i / ADJECTIVES.len()) % NOUNS.len()];
            Document::new(
                format!("https://shop.dev/product/{i}"),
                format!("{adj} {noun} {i}"),
                format!("A {adj} {noun} that pairs well with any {} {}", ADJECTIVES[(i + 3) % 8], NOUNS[(i + 5) % 8]),
            )
            .with_ratings(&[(i % 5) as f64 + 1.0])
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let mut synonyms = SynonymTable::new();
    synonyms.insert("usa", ["united states", "america"]);
    let engine = SearchEngine::new(IndexStore::from_built(build(corpus(5_000)), synonyms), SearchConfig::default());
    c.bench_function("search_three_terms", |b| b.iter(|| engine.search("organic coffee bottle")));
    c.bench_function("search_misspelled", |b| b.iter(|| engine.search("wireles keybord")));
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
