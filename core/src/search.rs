use anyhow::{anyhow, Result};
use regex::RegexBuilder;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::model::{Book, BookId, CentralityRecord, JaccardEdge, Posting, TopTerm, Word, WordId};
use crate::tokenizer;

/// Where a hit matched, best first: a title substring beats a top-term hit,
/// which beats a plain posting hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchSource {
    Title,
    TopTerms,
    Postings,
}

impl MatchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchSource::Title => "title",
            MatchSource::TopTerms => "top_terms",
            MatchSource::Postings => "postings",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub source: MatchSource,
    /// Occurrences of the matched term(s) in the book; 0 for title hits.
    pub match_count: u64,
    /// Distinct index words the pattern matched (regex mode only).
    pub matched_words: Vec<String>,
    pub pagerank: f64,
}

/// The loaded tables a search runs against. Built once per query batch;
/// centrality is optional (pre-centrality stores rank with pagerank 0).
pub struct Catalog {
    books: Vec<Book>,
    words: Vec<Word>,
    postings: Vec<Posting>,
    top_terms: Vec<TopTerm>,
    word_ids: HashMap<String, WordId>,
    pagerank: HashMap<BookId, f64>,
}

impl Catalog {
    pub fn new(
        mut books: Vec<Book>,
        words: Vec<Word>,
        postings: Vec<Posting>,
        top_terms: Vec<TopTerm>,
        centrality: Vec<CentralityRecord>,
    ) -> Self {
        books.sort_by_key(|b| b.id);
        let word_ids = words.iter().map(|w| (w.term.clone(), w.id)).collect();
        let pagerank = centrality.into_iter().map(|c| (c.book_id, c.pagerank)).collect();
        Self {
            books,
            words,
            postings,
            top_terms,
            word_ids,
            pagerank,
        }
    }

    fn book(&self, id: BookId) -> Option<&Book> {
        // books are stored ascending by id
        self.books
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|i| &self.books[i])
    }

    fn pagerank_of(&self, id: BookId) -> f64 {
        self.pagerank.get(&id).copied().unwrap_or(0.0)
    }

    /// Keyword search. The query is normalized to its first usable token;
    /// each book appears once, at its best-matching source, ordered by
    /// source, match count, pagerank, then title.
    pub fn search(&self, raw_query: &str, limit: usize) -> Vec<SearchHit> {
        let Some(q_norm) = tokenizer::tokenize(raw_query).into_iter().next() else {
            return Vec::new();
        };
        let raw_lower = raw_query.trim().to_lowercase();

        let mut best: HashMap<BookId, (MatchSource, u64)> = HashMap::new();

        if !raw_lower.is_empty() {
            for b in &self.books {
                if b.title.to_lowercase().contains(&raw_lower) {
                    best.insert(b.id, (MatchSource::Title, 0));
                }
            }
        }
        for t in &self.top_terms {
            if t.term == q_norm {
                upgrade(&mut best, t.book_id, MatchSource::TopTerms, t.count);
            }
        }
        if let Some(&word_id) = self.word_ids.get(&q_norm) {
            for p in &self.postings {
                if p.word_id == word_id {
                    upgrade(&mut best, p.book_id, MatchSource::Postings, p.count);
                }
            }
        }

        self.rank(best.into_iter().map(|(id, (source, count))| {
            (id, source, count, Vec::new())
        }), limit)
    }

    /// Regex search over the index vocabulary ("indexing" mode): the
    /// pattern is matched case-insensitively against every indexed word
    /// and every title, and matching words are aggregated per book across
    /// top_terms and postings. An invalid pattern is an input error.
    pub fn search_regex(&self, pattern: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| anyhow!("invalid regex {pattern:?}: {e}"))?;

        let matched: HashMap<WordId, &str> = self
            .words
            .iter()
            .filter(|w| re.is_match(&w.term))
            .map(|w| (w.id, w.term.as_str()))
            .collect();
        tracing::debug!(pattern, matched_words = matched.len(), "regex vocabulary scan");

        struct Agg {
            source: MatchSource,
            words: BTreeSet<String>,
            total: u64,
        }
        let mut per_book: HashMap<BookId, Agg> = HashMap::new();
        let mut touch = |id: BookId, source: MatchSource, word: Option<&str>, count: u64| {
            let agg = per_book.entry(id).or_insert_with(|| Agg {
                source,
                words: BTreeSet::new(),
                total: 0,
            });
            agg.source = agg.source.min(source);
            if let Some(w) = word {
                agg.words.insert(w.to_string());
            }
            agg.total += count;
        };

        for b in &self.books {
            if re.is_match(&b.title) {
                touch(b.id, MatchSource::Title, None, 0);
            }
        }
        for t in &self.top_terms {
            if let Some(&word) = matched.get(&t.word_id) {
                touch(t.book_id, MatchSource::TopTerms, Some(word), 0);
            }
        }
        // Occurrence totals come from postings, the complete index.
        for p in &self.postings {
            if let Some(&word) = matched.get(&p.word_id) {
                touch(p.book_id, MatchSource::Postings, Some(word), p.count);
            }
        }

        let mut hits: Vec<SearchHit> = per_book
            .into_iter()
            .filter_map(|(id, agg)| {
                self.book(id).map(|b| SearchHit {
                    book_id: id,
                    title: b.title.clone(),
                    author: b.author.clone(),
                    source: agg.source,
                    match_count: agg.total,
                    matched_words: agg.words.into_iter().collect(),
                    pagerank: self.pagerank_of(id),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| b.matched_words.len().cmp(&a.matched_words.len()))
                .then_with(|| b.match_count.cmp(&a.match_count))
                .then_with(|| a.title.cmp(&b.title))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    fn rank<I>(&self, entries: I, limit: usize) -> Vec<SearchHit>
    where
        I: Iterator<Item = (BookId, MatchSource, u64, Vec<String>)>,
    {
        let mut hits: Vec<SearchHit> = entries
            .filter_map(|(id, source, count, matched_words)| {
                self.book(id).map(|b| SearchHit {
                    book_id: id,
                    title: b.title.clone(),
                    author: b.author.clone(),
                    source,
                    match_count: count,
                    matched_words,
                    pagerank: self.pagerank_of(id),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| b.match_count.cmp(&a.match_count))
                .then_with(|| {
                    b.pagerank
                        .partial_cmp(&a.pagerank)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.title.cmp(&b.title))
        });
        hits.truncate(limit);
        hits
    }
}

/// Keep the best source per book; within the same source, the larger count.
fn upgrade(
    best: &mut HashMap<BookId, (MatchSource, u64)>,
    id: BookId,
    source: MatchSource,
    count: u64,
) {
    best.entry(id)
        .and_modify(|slot| match source.cmp(&slot.0) {
            Ordering::Less => *slot = (source, count),
            Ordering::Equal if count > slot.1 => slot.1 = count,
            _ => {}
        })
        .or_insert((source, count));
}

/// Jaccard neighbors of a book, similarity descending, pagerank then id as
/// tie-breaks. This is the recommendation list the serving layer shows.
pub fn similar_books(
    edges: &[JaccardEdge],
    centrality: &[CentralityRecord],
    book_id: BookId,
    limit: usize,
) -> Vec<(BookId, f64)> {
    let pagerank: HashMap<BookId, f64> = centrality
        .iter()
        .map(|c| (c.book_id, c.pagerank))
        .collect();
    let mut neighbors: Vec<(BookId, f64)> = edges
        .iter()
        .filter(|e| e.touches(book_id))
        .map(|e| (e.other(book_id), e.similarity))
        .collect();
    neighbors.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                let pa = pagerank.get(&a.0).copied().unwrap_or(0.0);
                let pb = pagerank.get(&b.0).copied().unwrap_or(0.0);
                pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.0.cmp(&b.0))
    });
    neighbors.truncate(limit);
    neighbors
}
