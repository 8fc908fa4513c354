use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use walkdir::WalkDir;

use biblio_core::centrality::{betweenness, closeness, pagerank, PageRankParams};
use biblio_core::graph::SimilarityGraph;
use biblio_core::index::{count_terms, IndexAccumulator, DEFAULT_TOP_TERMS};
use biblio_core::jaccard::{build_edges, term_sets};
use biblio_core::model::{Book, BookMeta, CentralityRecord};
use biblio_core::search::{similar_books, Catalog, SearchHit};
use biblio_core::store::{Store, StoreMeta, SCHEMA_VERSION};
use biblio_core::tokenizer;

pub struct IngestOptions {
    /// Books with fewer usable tokens than this are skipped entirely.
    pub min_words: u64,
    pub top_terms: usize,
    /// Replacement stopword set; the built-in English list when None.
    pub stopwords: Option<HashSet<String>>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            min_words: 10_000,
            top_terms: DEFAULT_TOP_TERMS,
            stopwords: None,
        }
    }
}

#[derive(Debug)]
pub struct IngestReport {
    pub books: usize,
    pub skipped: usize,
    pub words: usize,
    pub postings: usize,
}

#[derive(Debug)]
pub struct JaccardReport {
    pub books: usize,
    pub edges: usize,
}

#[derive(Debug)]
pub struct CentralityReport {
    pub books: usize,
    pub edges: usize,
    pub pagerank_iterations: usize,
    pub converged: bool,
}

/// A corpus file tokenized and counted, ready for the deterministic merge.
struct LoadedBook {
    meta: BookMeta,
    gutenberg_id: u64,
    word_count: u64,
    counts: BTreeMap<String, u64>,
}

/// Ingest a corpus directory into the store: walk `pg_{id}_*.txt` files,
/// tokenize and count each book on the rayon pool, then merge in ascending
/// Gutenberg-id order so book and word ids come out identical on every
/// run. Replaces books, words, postings and top_terms wholesale.
pub fn run_ingest(corpus: &Path, store: &Store, opts: &IngestOptions) -> Result<IngestReport> {
    let files = discover_corpus(corpus)?;
    tracing::info!(files = files.len(), corpus = %corpus.display(), "scanning corpus");

    let loaded: Vec<LoadedBook> = files
        .par_iter()
        .filter_map(|path| match load_book(path, opts) {
            Ok(book) => book,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skipping unreadable book");
                None
            }
        })
        .collect();

    let skipped = files.len() - loaded.len();
    let mut loaded = loaded;
    loaded.sort_by_key(|b| b.gutenberg_id);

    let mut acc = IndexAccumulator::new(opts.top_terms);
    for (i, book) in loaded.into_iter().enumerate() {
        let row = Book {
            id: i as u32 + 1,
            gutenberg_id: Some(book.gutenberg_id),
            title: book.meta.title.unwrap_or_else(|| "Unknown".into()),
            author: book.meta.author.unwrap_or_else(|| "Unknown".into()),
            language: book.meta.language.unwrap_or_else(|| "unknown".into()),
            word_count: book.word_count,
            cover_url: book.meta.cover_url,
        };
        acc.add_book(row, book.counts);
    }

    let tables = acc.into_tables();
    let report = IngestReport {
        books: tables.books.len(),
        skipped,
        words: tables.words.len(),
        postings: tables.postings.len(),
    };

    store.save_books(&tables.books)?;
    store.save_words(&tables.words)?;
    store.save_postings(&tables.postings)?;
    store.save_top_terms(&tables.top_terms)?;
    store.save_meta(&StoreMeta {
        num_books: tables.books.len() as u32,
        created_at: now_rfc3339(),
        version: SCHEMA_VERSION,
    })?;

    tracing::info!(
        books = report.books,
        skipped = report.skipped,
        words = report.words,
        postings = report.postings,
        "ingest complete"
    );
    Ok(report)
}

fn discover_corpus(corpus: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(corpus)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    if files.is_empty() {
        tracing::warn!(corpus = %corpus.display(), "no .txt files found in corpus directory");
    }
    Ok(files)
}

/// Read, tokenize and count one book. `Ok(None)` means the book was
/// skipped (no Gutenberg id in the filename, or under the word minimum);
/// `Err` means the file itself could not be processed.
fn load_book(path: &Path, opts: &IngestOptions) -> Result<Option<LoadedBook>> {
    let Some(gutenberg_id) = gutenberg_id_from_path(path) else {
        tracing::warn!(path = %path.display(), "filename has no pg_<id>_ prefix, skipping");
        return Ok(None);
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let word_count = tokenizer::word_count(&text);
    if word_count < opts.min_words {
        tracing::debug!(
            path = %path.display(),
            word_count,
            min = opts.min_words,
            "below word minimum, skipping"
        );
        return Ok(None);
    }

    let tokens = match &opts.stopwords {
        Some(set) => tokenizer::tokenize_with(&text, set),
        None => tokenizer::tokenize(&text),
    };

    let meta = read_sidecar(path, gutenberg_id);
    Ok(Some(LoadedBook {
        meta,
        gutenberg_id,
        word_count,
        counts: count_terms(tokens),
    }))
}

fn gutenberg_id_from_path(path: &Path) -> Option<u64> {
    let name = path.file_stem()?.to_str()?;
    let rest = name.strip_prefix("pg_")?;
    let digits: &str = &rest[..rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len())];
    digits.parse().ok()
}

/// The fetcher leaves a `pg_{id}_meta.json` next to each text. A missing
/// or malformed sidecar falls back to a title derived from the filename.
fn read_sidecar(path: &Path, gutenberg_id: u64) -> BookMeta {
    let sidecar = path.with_file_name(format!("pg_{gutenberg_id}_meta.json"));
    if let Ok(raw) = fs::read_to_string(&sidecar) {
        match serde_json::from_str::<BookMeta>(&raw) {
            Ok(meta) => return meta,
            Err(err) => {
                tracing::warn!(path = %sidecar.display(), %err, "malformed meta sidecar");
            }
        }
    }
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix(&format!("pg_{gutenberg_id}_")).map(str::to_string))
        .map(|slug| slug.replace('_', " ").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".into());
    BookMeta {
        gutenberg_id: Some(gutenberg_id),
        title: Some(title),
        ..BookMeta::default()
    }
}

/// Rebuild the jaccard_edges table from top_terms. Full replace,
/// independently re-runnable.
pub fn run_jaccard(store: &Store, threshold: f64) -> Result<JaccardReport> {
    let top_terms = store.load_top_terms()?;
    let sets = term_sets(&top_terms);
    tracing::info!(books = sets.len(), threshold, "building jaccard graph");

    let edges = build_edges(&sets, threshold);
    store.save_jaccard_edges(&edges)?;

    tracing::info!(edges = edges.len(), "jaccard graph complete");
    Ok(JaccardReport {
        books: sets.len(),
        edges: edges.len(),
    })
}

/// Rebuild book_centrality from jaccard_edges and the book table. All
/// three metrics run over the same adjacency; isolated books get pagerank
/// mass and zero closeness/betweenness. Full replace.
pub fn run_centrality(store: &Store, params: PageRankParams) -> Result<CentralityReport> {
    let books = store.load_books()?;
    let edges = store.load_jaccard_edges()?;
    let graph = SimilarityGraph::build(&books, &edges);
    tracing::info!(
        books = graph.len(),
        edges = graph.num_edges(),
        "computing centrality"
    );

    let pr = pagerank(&graph, params);
    tracing::info!(
        iterations = pr.iterations,
        converged = pr.converged,
        "pagerank finished"
    );
    let close = closeness(&graph);
    let between = betweenness(&graph);

    let records: Vec<CentralityRecord> = graph
        .ids()
        .iter()
        .enumerate()
        .map(|(i, &book_id)| CentralityRecord {
            book_id,
            pagerank: pr.scores[i],
            closeness: close[i],
            betweenness: between[i],
        })
        .collect();
    store.save_centrality(&records)?;

    tracing::info!(records = records.len(), "centrality complete");
    Ok(CentralityReport {
        books: graph.len(),
        edges: graph.num_edges(),
        pagerank_iterations: pr.iterations,
        converged: pr.converged,
    })
}

/// Keyword or regex search against the persisted tables. Centrality is
/// optional: before `run_centrality` has ever run, hits rank with
/// pagerank 0.
pub fn run_search(store: &Store, query: &str, regex: bool, limit: usize) -> Result<Vec<SearchHit>> {
    let catalog = Catalog::new(
        store.load_books()?,
        store.load_words()?,
        store.load_postings()?,
        store.load_top_terms()?,
        store.load_centrality().unwrap_or_default(),
    );
    if regex {
        catalog.search_regex(query, limit)
    } else {
        Ok(catalog.search(query, limit))
    }
}

/// Jaccard-neighbor recommendations for one book, resolved to book rows.
pub fn run_similar(store: &Store, book_id: u32, limit: usize) -> Result<Vec<(Book, f64)>> {
    let books = store.load_books()?;
    let edges = store.load_jaccard_edges()?;
    let centrality = store.load_centrality().unwrap_or_default();

    let by_id: HashMap<u32, &Book> = books.iter().map(|b| (b.id, b)).collect();
    Ok(similar_books(&edges, &centrality, book_id, limit)
        .into_iter()
        .filter_map(|(id, sim)| by_id.get(&id).map(|&b| (b.clone(), sim)))
        .collect())
}

/// Print the jaccard graph report: corpus coverage, similarity spread,
/// the most similar pairs and the degree distribution.
pub fn run_stats(store: &Store) -> Result<()> {
    let books = store.load_books()?;
    let edges = store.load_jaccard_edges()?;
    let titles: HashMap<u32, &str> = books.iter().map(|b| (b.id, b.title.as_str())).collect();

    let n = books.len();
    let max_edges = n.saturating_sub(1) * n / 2;
    println!("books: {n}");
    if max_edges > 0 {
        println!(
            "edges: {} / {} ({:.2}%)",
            edges.len(),
            max_edges,
            100.0 * edges.len() as f64 / max_edges as f64
        );
    } else {
        println!("edges: {}", edges.len());
    }

    if !edges.is_empty() {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let mut sum = 0.0;
        for e in &edges {
            min = min.min(e.similarity);
            max = max.max(e.similarity);
            sum += e.similarity;
        }
        println!(
            "similarity: min {:.4}  avg {:.4}  max {:.4}",
            min,
            sum / edges.len() as f64,
            max
        );

        let mut by_sim = edges.clone();
        by_sim.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        println!("\ntop pairs:");
        for e in by_sim.iter().take(10) {
            println!(
                "  {:.4}  {} -- {}",
                e.similarity,
                titles.get(&e.book_id1).unwrap_or(&"?"),
                titles.get(&e.book_id2).unwrap_or(&"?"),
            );
        }

        let mut degrees: HashMap<u32, usize> = HashMap::new();
        for e in &edges {
            *degrees.entry(e.book_id1).or_insert(0) += 1;
            *degrees.entry(e.book_id2).or_insert(0) += 1;
        }
        let mut distribution: BTreeMap<usize, usize> = BTreeMap::new();
        for &d in degrees.values() {
            *distribution.entry(d).or_insert(0) += 1;
        }
        if n > degrees.len() {
            distribution.insert(0, n - degrees.len());
        }
        println!("\ndegree distribution:");
        for (degree, count) in distribution {
            println!("  {degree:5} | {count}");
        }
    }
    Ok(())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}
