use biblio_core::jaccard::{build_edges, jaccard, term_sets};
use biblio_core::model::{BookId, TopTerm, WordId};
use std::collections::{BTreeMap, HashSet};

fn sets(input: &[(BookId, &[WordId])]) -> BTreeMap<BookId, HashSet<WordId>> {
    input
        .iter()
        .map(|(id, words)| (*id, words.iter().copied().collect()))
        .collect()
}

// word ids: a=1 b=2 c=3 d=4 x=8 y=9 z=10
fn four_book_corpus() -> BTreeMap<BookId, HashSet<WordId>> {
    sets(&[
        (1, &[1, 2, 3]),
        (2, &[1, 2, 4]),
        (3, &[8, 9, 10]),
        (4, &[1, 2, 3, 4]),
    ])
}

#[test]
fn similarity_is_symmetric_and_in_range() {
    let corpus = four_book_corpus();
    let ids: Vec<BookId> = corpus.keys().copied().collect();
    for &i in &ids {
        for &j in &ids {
            let sij = jaccard(&corpus[&i], &corpus[&j]);
            let sji = jaccard(&corpus[&j], &corpus[&i]);
            assert_eq!(sij, sji);
            assert!((0.0..=1.0).contains(&sij));
        }
    }
}

#[test]
fn edges_exist_iff_at_threshold() {
    let edges = build_edges(&four_book_corpus(), 0.5);
    let pairs: Vec<(BookId, BookId)> = edges.iter().map(|e| (e.book_id1, e.book_id2)).collect();
    // J(1,2)=2/4=0.5, J(1,4)=3/4, J(2,4)=3/4, everything with 3 is 0
    assert_eq!(pairs, vec![(1, 2), (1, 4), (2, 4)]);

    let sims: BTreeMap<(BookId, BookId), f64> =
        edges.iter().map(|e| ((e.book_id1, e.book_id2), e.similarity)).collect();
    assert_eq!(sims[&(1, 2)], 0.5);
    assert_eq!(sims[&(1, 4)], 0.75);
    assert_eq!(sims[&(2, 4)], 0.75);
}

#[test]
fn no_self_or_reversed_edges() {
    let edges = build_edges(&four_book_corpus(), 0.0);
    let mut seen = HashSet::new();
    for e in &edges {
        assert!(e.book_id1 < e.book_id2);
        assert!(seen.insert((e.book_id1, e.book_id2)));
    }
}

#[test]
fn raising_the_threshold_only_shrinks_the_edge_set() {
    let corpus = four_book_corpus();
    let loose: HashSet<(BookId, BookId)> = build_edges(&corpus, 0.5)
        .iter()
        .map(|e| (e.book_id1, e.book_id2))
        .collect();
    let tight: HashSet<(BookId, BookId)> = build_edges(&corpus, 0.7)
        .iter()
        .map(|e| (e.book_id1, e.book_id2))
        .collect();
    assert!(tight.is_subset(&loose));
    assert_eq!(tight.len(), 2); // the 0.5 edge is gone
}

#[test]
fn empty_sets_score_zero_not_a_division_error() {
    let corpus = sets(&[(1, &[]), (2, &[1, 2]), (3, &[])]);
    // an empty set has similarity 0 with everything, including another
    // empty set, so any positive threshold drops those pairs
    let edges = build_edges(&corpus, 0.1);
    assert!(edges.is_empty());
    // at threshold 0 the zero-similarity pairs survive with a defined value
    let all = build_edges(&corpus, 0.0);
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|e| e.similarity == 0.0));
}

#[test]
fn term_sets_group_by_book() {
    let rows = vec![
        TopTerm { book_id: 2, word_id: 7, term: "sea".into(), count: 4, rank: 1 },
        TopTerm { book_id: 1, word_id: 7, term: "sea".into(), count: 9, rank: 1 },
        TopTerm { book_id: 1, word_id: 8, term: "whale".into(), count: 3, rank: 2 },
    ];
    let sets = term_sets(&rows);
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[&1].len(), 2);
    assert_eq!(sets[&2].len(), 1);
}
