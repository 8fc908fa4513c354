use std::collections::HashMap;

use crate::model::{Book, BookId, JaccardEdge};

/// Undirected weighted graph over the whole corpus, built from the Jaccard
/// edge table. Vertices cover every book, not just those with edges, so
/// isolated books keep their (degenerate) centrality rows.
pub struct SimilarityGraph {
    ids: Vec<BookId>,
    index: HashMap<BookId, usize>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl SimilarityGraph {
    /// Vertices are the union of the book table and every edge endpoint,
    /// in ascending id order.
    pub fn build(books: &[Book], edges: &[JaccardEdge]) -> Self {
        let mut ids: Vec<BookId> = books.iter().map(|b| b.id).collect();
        for e in edges {
            ids.push(e.book_id1);
            ids.push(e.book_id2);
        }
        ids.sort_unstable();
        ids.dedup();

        let index: HashMap<BookId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut adjacency = vec![Vec::new(); ids.len()];
        for e in edges {
            let a = index[&e.book_id1];
            let b = index[&e.book_id2];
            adjacency[a].push((b, e.similarity));
            adjacency[b].push((a, e.similarity));
        }

        Self { ids, index, adjacency }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Book ids in vertex order (ascending).
    pub fn ids(&self) -> &[BookId] {
        &self.ids
    }

    pub fn index_of(&self, id: BookId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn neighbors(&self, vertex: usize) -> &[(usize, f64)] {
        &self.adjacency[vertex]
    }

    pub fn degree(&self, vertex: usize) -> usize {
        self.adjacency[vertex].len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }
}
