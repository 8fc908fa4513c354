use std::collections::{BTreeMap, HashMap};

use crate::model::{Book, Posting, TopTerm, Word, WordId};

/// Default number of top terms kept per book.
pub const DEFAULT_TOP_TERMS: usize = 50;

/// Exact per-book term counts. Keyed lexicographically so that downstream
/// word-id assignment has a total order and re-ingestion reproduces ids.
pub fn count_terms<I>(tokens: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = String>,
{
    let mut counts = BTreeMap::new();
    for token in tokens {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Mutable state for one ingest run. The orchestrator creates it empty,
/// feeds it one book at a time in ascending book-id order, then drains it
/// into the store. Word ids are assigned at first encounter, so the same
/// corpus processed in the same order yields identical tables.
///
/// Replaces ambient module-level aggregation with an explicit object whose
/// lifecycle (init empty, fill, flush) is owned by the batch job.
#[derive(Default)]
pub struct IndexAccumulator {
    dictionary: HashMap<String, WordId>,
    words: Vec<Word>,
    books: Vec<Book>,
    postings: Vec<Posting>,
    top_terms: Vec<TopTerm>,
    top_k: usize,
}

impl IndexAccumulator {
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    pub fn num_books(&self) -> usize {
        self.books.len()
    }

    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Record one book and its term counts. A book with no usable terms
    /// (all stopwords, or empty) contributes only its row in `books`:
    /// zero postings and an empty top-term set, not an error.
    pub fn add_book(&mut self, book: Book, counts: BTreeMap<String, u64>) {
        let book_id = book.id;
        self.books.push(book);

        let mut ranked: Vec<(WordId, String, u64)> = Vec::with_capacity(counts.len());
        for (term, count) in counts {
            let word_id = self.intern(&term);
            self.postings.push(Posting { word_id, book_id, count });
            ranked.push((word_id, term, count));
        }

        // Top-k by count descending, term ascending on ties.
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.cmp(&b.1)));
        ranked.truncate(self.top_k);
        for (i, (word_id, term, count)) in ranked.into_iter().enumerate() {
            self.top_terms.push(TopTerm {
                book_id,
                word_id,
                term,
                count,
                rank: i as u32 + 1,
            });
        }
    }

    fn intern(&mut self, term: &str) -> WordId {
        if let Some(&id) = self.dictionary.get(term) {
            return id;
        }
        let id = self.words.len() as WordId + 1;
        self.dictionary.insert(term.to_string(), id);
        self.words.push(Word {
            id,
            term: term.to_string(),
        });
        id
    }

    /// Drain into sorted table vectors ready for a full-replace write.
    pub fn into_tables(self) -> IndexTables {
        let mut postings = self.postings;
        postings.sort_by_key(|p| (p.word_id, p.book_id));
        IndexTables {
            books: self.books,
            words: self.words,
            postings,
            top_terms: self.top_terms,
        }
    }
}

/// The four tables ingest owns, in their persisted order: books ascending
/// by id, words ascending by id, postings by (word, book), top terms by
/// (book, rank).
pub struct IndexTables {
    pub books: Vec<Book>,
    pub words: Vec<Word>,
    pub postings: Vec<Posting>,
    pub top_terms: Vec<TopTerm>,
}
