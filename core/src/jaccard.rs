use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

use crate::model::{BookId, JaccardEdge, TopTerm, WordId};

/// Default similarity threshold for keeping an edge.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Jaccard similarity of two term-id sets: |A ∩ B| / |A ∪ B|.
/// Defined as 0 when either set is empty, never a division by zero.
pub fn jaccard(a: &HashSet<WordId>, b: &HashSet<WordId>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Group top terms into one id set per book, keyed in ascending book order.
pub fn term_sets(top_terms: &[TopTerm]) -> BTreeMap<BookId, HashSet<WordId>> {
    let mut sets: BTreeMap<BookId, HashSet<WordId>> = BTreeMap::new();
    for t in top_terms {
        sets.entry(t.book_id).or_default().insert(t.word_id);
    }
    sets
}

/// All unordered book pairs with similarity >= threshold, canonicalized
/// smaller id first and sorted by (book_id1, book_id2).
///
/// Pairs are generated streaming per outer book, so nothing O(B²) is
/// materialized beyond the retained edges. The outer loop is partitioned
/// across the rayon pool; each worker emits its own edge batch and the
/// batches are merged and sorted at the end (no shared mutable collector).
pub fn build_edges(sets: &BTreeMap<BookId, HashSet<WordId>>, threshold: f64) -> Vec<JaccardEdge> {
    let books: Vec<(BookId, &HashSet<WordId>)> = sets.iter().map(|(&id, set)| (id, set)).collect();

    let mut edges: Vec<JaccardEdge> = books
        .par_iter()
        .enumerate()
        .flat_map_iter(|(i, &(id_a, set_a))| {
            books[i + 1..].iter().filter_map(move |&(id_b, set_b)| {
                let similarity = jaccard(set_a, set_b);
                (similarity >= threshold).then(|| JaccardEdge::new(id_a, id_b, similarity))
            })
        })
        .collect();

    edges.sort_by(|a, b| (a.book_id1, a.book_id2).cmp(&(b.book_id1, b.book_id2)));
    edges
}
