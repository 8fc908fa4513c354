use criterion::{criterion_group, criterion_main, Criterion};

use biblio_core::centrality::{pagerank, PageRankParams};
use biblio_core::graph::SimilarityGraph;
use biblio_core::model::{Book, JaccardEdge};
use biblio_core::tokenizer::tokenize;

fn bench_tokenize(c: &mut Criterion) {
    let paragraph = "It was a fine morning and the harbour was crowded with \
        ships of every nation, their sails catching the early light while \
        sailors called to one another across the water. ";
    let text = paragraph.repeat(500);
    c.bench_function("tokenize_100k_chars", |b| b.iter(|| tokenize(&text)));
}

fn bench_pagerank(c: &mut Criterion) {
    // ring of 500 books with a few chords, similarity in (0.5, 1.0]
    let n: u32 = 500;
    let books: Vec<Book> = (1..=n)
        .map(|id| Book {
            id,
            gutenberg_id: Some(id as u64),
            title: format!("book {id}"),
            author: "Unknown".into(),
            language: "en".into(),
            word_count: 10_000,
            cover_url: None,
        })
        .collect();
    let mut edges: Vec<JaccardEdge> = (1..n)
        .map(|i| JaccardEdge::new(i, i + 1, 0.6))
        .collect();
    edges.push(JaccardEdge::new(n, 1, 0.6));
    for i in (1..n - 7).step_by(7) {
        edges.push(JaccardEdge::new(i, i + 7, 0.55));
    }
    let graph = SimilarityGraph::build(&books, &edges);

    c.bench_function("pagerank_ring_500", |b| {
        b.iter(|| pagerank(&graph, PageRankParams::default()))
    });
}

criterion_group!(benches, bench_tokenize, bench_pagerank);
criterion_main!(benches);
