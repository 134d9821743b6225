//! Benchmarks for the hot path of citation post-processing (§4.2): URL
//! normalization runs once per citation on every grounded response, and
//! dedup runs once per response over the full citation list.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use llmgw_citations::{dedupe_citations, normalize_url};
use llmgw_core::{Citation, CitationType};

fn bench_normalize_url(c: &mut Criterion) {
    let url = "https://Example.com/Article?utm_source=newsletter&utm_campaign=spring&ref=homepage&id=42#section-2";

    c.bench_function("normalize_url_with_tracking_params", |b| {
        b.iter(|| normalize_url(black_box(url), None));
    });
}

fn citation_set(n: usize) -> Vec<Citation> {
    (0..n)
        .map(|i| {
            let domain = i % 20;
            Citation::new(
                format!("https://source{domain}.example.org/article/{i}.pdf"),
                CitationType::Anchored,
                i,
            )
        })
        .collect()
}

fn bench_dedupe_citations(c: &mut Criterion) {
    let citations = citation_set(200);

    c.bench_function("dedupe_citations_200_across_20_domains", |b| {
        b.iter(|| dedupe_citations(black_box(&citations), &[], &[], 2));
    });
}

criterion_group!(benches, bench_normalize_url, bench_dedupe_citations);
criterion_main!(benches);
