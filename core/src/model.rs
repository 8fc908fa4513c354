use serde::{Deserialize, Serialize};

pub type BookId = u32;
pub type WordId = u32;

/// One corpus book. Created at ingest time and immutable until the next
/// full re-ingestion replaces the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub gutenberg_id: Option<u64>,
    pub title: String,
    pub author: String,
    pub language: String,
    /// Token count before stopword filtering.
    pub word_count: u64,
    pub cover_url: Option<String>,
}

/// Vocabulary entry, unique by normalized spelling across the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub term: String,
}

/// Occurrence count of a word in a book; at most one row per (word, book).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub word_id: WordId,
    pub book_id: BookId,
    pub count: u64,
}

/// One of a book's highest-count terms. `rank` starts at 1; ties on count
/// are broken by ascending term so the set is reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTerm {
    pub book_id: BookId,
    pub word_id: WordId,
    pub term: String,
    pub count: u64,
    pub rank: u32,
}

/// Undirected similarity edge, stored once with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JaccardEdge {
    pub book_id1: BookId,
    pub book_id2: BookId,
    pub similarity: f64,
}

impl JaccardEdge {
    /// Canonicalize an unordered pair. The two ids must be distinct.
    pub fn new(a: BookId, b: BookId, similarity: f64) -> Self {
        debug_assert_ne!(a, b, "self edges are not representable");
        let (book_id1, book_id2) = if a < b { (a, b) } else { (b, a) };
        Self { book_id1, book_id2, similarity }
    }

    pub fn touches(&self, id: BookId) -> bool {
        self.book_id1 == id || self.book_id2 == id
    }

    /// The endpoint that is not `id`. Only meaningful when `touches(id)`.
    pub fn other(&self, id: BookId) -> BookId {
        if self.book_id1 == id {
            self.book_id2
        } else {
            self.book_id1
        }
    }
}

/// Per-book centrality scores over the Jaccard graph. Pagerank values sum
/// to 1 across the corpus; isolated books score 0 on the other two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralityRecord {
    pub book_id: BookId,
    pub pagerank: f64,
    pub closeness: f64,
    pub betweenness: f64,
}

/// Metadata sidecar written by the fetcher next to each book text
/// (`pg_{id}_meta.json`) and read back at ingest time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMeta {
    #[serde(default)]
    pub gutenberg_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}
