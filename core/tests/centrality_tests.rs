use biblio_core::centrality::{betweenness, closeness, pagerank, PageRankParams};
use biblio_core::graph::SimilarityGraph;
use biblio_core::model::{Book, BookId, JaccardEdge};

fn book(id: BookId) -> Book {
    Book {
        id,
        gutenberg_id: Some(id as u64),
        title: format!("book {id}"),
        author: "Unknown".to_string(),
        language: "en".to_string(),
        word_count: 0,
        cover_url: None,
    }
}

fn graph(ids: &[BookId], edges: &[(BookId, BookId, f64)]) -> SimilarityGraph {
    let books: Vec<Book> = ids.iter().map(|&id| book(id)).collect();
    let edges: Vec<JaccardEdge> = edges
        .iter()
        .map(|&(a, b, s)| JaccardEdge::new(a, b, s))
        .collect();
    SimilarityGraph::build(&books, &edges)
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn pagerank_sums_to_one_on_a_path() {
    let g = graph(&[1, 2, 3], &[(1, 2, 0.6), (2, 3, 0.6)]);
    let pr = pagerank(&g, PageRankParams::default());
    assert!(pr.converged);
    assert!(pr.iterations >= 1);
    let sum: f64 = pr.scores.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
    // the middle book collects more mass than the endpoints
    assert!(pr.scores[1] > pr.scores[0]);
    assert_close(pr.scores[0], pr.scores[2]);
}

#[test]
fn pagerank_is_uniform_on_an_edgeless_graph() {
    let g = graph(&[1, 2, 3, 4], &[]);
    let pr = pagerank(&g, PageRankParams::default());
    assert!(pr.converged);
    assert_eq!(pr.iterations, 1);
    for &s in &pr.scores {
        assert_close(s, 0.25);
    }
}

#[test]
fn pagerank_handles_single_and_empty_graphs() {
    let single = pagerank(&graph(&[7], &[]), PageRankParams::default());
    assert_eq!(single.scores.len(), 1);
    assert_close(single.scores[0], 1.0);

    let empty = pagerank(&graph(&[], &[]), PageRankParams::default());
    assert!(empty.scores.is_empty());
    assert!(empty.converged);
}

#[test]
fn pagerank_keeps_dangling_mass_in_the_distribution() {
    // books 1,2,4 form a triangle-ish component, 3 is isolated (dangling)
    let g = graph(
        &[1, 2, 3, 4],
        &[(1, 2, 0.5), (1, 4, 0.75), (2, 4, 0.75)],
    );
    let pr = pagerank(&g, PageRankParams::default());
    let sum: f64 = pr.scores.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
    // the isolated book still holds some rank, strictly less than connected ones
    let isolated = pr.scores[2];
    assert!(isolated > 0.0);
    assert!(pr.scores.iter().enumerate().all(|(i, &s)| i == 2 || s > isolated));
}

#[test]
fn pagerank_reports_non_convergence() {
    let g = graph(&[1, 2, 3], &[(1, 2, 0.6), (2, 3, 0.6)]);
    let pr = pagerank(
        &g,
        PageRankParams {
            max_iter: 1,
            ..PageRankParams::default()
        },
    );
    assert!(!pr.converged);
    assert_eq!(pr.iterations, 1);
    // the estimate is still a distribution
    let sum: f64 = pr.scores.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
}

#[test]
fn pagerank_is_invariant_under_relabeling() {
    let original = graph(&[1, 2, 3], &[(1, 2, 0.6), (2, 3, 0.6)]);
    // permute ids: 1 -> 9, 2 -> 5, 3 -> 1; vertex order becomes [1, 5, 9]
    let relabeled = graph(&[9, 5, 1], &[(9, 5, 0.6), (5, 1, 0.6)]);

    let pr_a = pagerank(&original, PageRankParams::default());
    let pr_b = pagerank(&relabeled, PageRankParams::default());

    let score = |g: &SimilarityGraph, pr: &[f64], id: BookId| pr[g.index_of(id).unwrap()];
    assert_close(score(&original, &pr_a.scores, 1), score(&relabeled, &pr_b.scores, 9));
    assert_close(score(&original, &pr_a.scores, 2), score(&relabeled, &pr_b.scores, 5));
    assert_close(score(&original, &pr_a.scores, 3), score(&relabeled, &pr_b.scores, 1));
}

#[test]
fn closeness_on_a_path() {
    let g = graph(&[1, 2, 3], &[(1, 2, 0.6), (2, 3, 0.6)]);
    let c = closeness(&g);
    assert_close(c[0], 2.0 / 3.0);
    assert_close(c[1], 1.0);
    assert_close(c[2], 2.0 / 3.0);
}

#[test]
fn closeness_of_an_isolated_book_is_zero() {
    let g = graph(&[1, 2, 3, 4], &[(1, 2, 0.5), (1, 4, 0.75), (2, 4, 0.75)]);
    let c = closeness(&g);
    assert_eq!(c[2], 0.0);
    // connected books only average over their own component
    assert_close(c[0], 1.0);
}

#[test]
fn closeness_on_an_edgeless_graph_is_all_zero() {
    let g = graph(&[1, 2, 3], &[]);
    assert!(closeness(&g).iter().all(|&c| c == 0.0));
}

#[test]
fn betweenness_peaks_at_the_middle_of_a_path() {
    let g = graph(&[1, 2, 3], &[(1, 2, 0.6), (2, 3, 0.6)]);
    let b = betweenness(&g);
    assert_eq!(b[0], 0.0);
    assert_eq!(b[2], 0.0);
    assert_close(b[1], 1.0);
    assert!(b[1] > b[0] && b[1] > b[2]);
}

#[test]
fn betweenness_is_zero_for_tiny_graphs() {
    assert!(betweenness(&graph(&[], &[])).is_empty());
    assert_eq!(betweenness(&graph(&[1], &[])), vec![0.0]);
    assert_eq!(betweenness(&graph(&[1, 2], &[(1, 2, 0.9)])), vec![0.0, 0.0]);
}

#[test]
fn betweenness_of_isolated_books_is_zero() {
    let g = graph(&[1, 2, 3, 4], &[(1, 2, 0.5), (1, 4, 0.75), (2, 4, 0.75)]);
    let b = betweenness(&g);
    assert_eq!(b[2], 0.0);
    // the triangle has no intermediate vertices either
    assert!(b.iter().all(|&x| x == 0.0));
}

#[test]
fn metrics_complete_on_a_disconnected_graph() {
    // two components plus an isolated vertex
    let g = graph(
        &[1, 2, 3, 4, 5],
        &[(1, 2, 0.8), (3, 4, 0.8)],
    );
    let pr = pagerank(&g, PageRankParams::default());
    let sum: f64 = pr.scores.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
    let c = closeness(&g);
    assert_close(c[0], 1.0);
    assert_eq!(c[4], 0.0);
    let b = betweenness(&g);
    assert!(b.iter().all(|&x| x == 0.0));
}
