use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use biblio_analytics::{
    run_centrality, run_ingest, run_jaccard, run_search, run_similar, run_stats, IngestOptions,
};
use biblio_core::centrality::PageRankParams;
use biblio_core::jaccard::DEFAULT_THRESHOLD;
use biblio_core::store::Store;

#[derive(Parser)]
#[command(name = "analytics")]
#[command(about = "Batch analytics for the book corpus: index, similarity graph, centrality", long_about = None)]
struct Cli {
    /// Store data directory (falls back to BIBLIO_DATA, then ./data/index)
    #[arg(long, global = true)]
    data: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize the corpus and build books/words/postings/top_terms
    Ingest {
        /// Directory of pg_{id}_{slug}.txt files with meta sidecars
        #[arg(long, default_value = "./data/raw")]
        corpus: String,
        /// Recreate the data directory before writing
        #[arg(long, default_value_t = false)]
        init: bool,
        /// Skip books with fewer usable tokens than this
        #[arg(long, default_value_t = 10_000)]
        min_words: u64,
        /// Top terms kept per book
        #[arg(long, default_value_t = 50)]
        top_terms: usize,
        /// Stopword file (one word per line) replacing the built-in list
        #[arg(long)]
        stopwords: Option<String>,
    },
    /// Build jaccard_edges from the top-term sets
    Jaccard {
        /// Minimum similarity for keeping an edge
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,
    },
    /// Compute pagerank, closeness and betweenness into book_centrality
    Centrality {
        #[arg(long, default_value_t = 0.85)]
        damping: f64,
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
        #[arg(long, default_value_t = 1e-6)]
        tolerance: f64,
    },
    /// Search the index by keyword or regex
    Search {
        query: String,
        /// Treat the query as a regular expression over indexed words
        #[arg(long, default_value_t = false)]
        regex: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Recommend books similar to the given book id
    Similar {
        book_id: u32,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the jaccard graph report
    Stats,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let data = cli
        .data
        .or_else(|| std::env::var("BIBLIO_DATA").ok())
        .unwrap_or_else(|| "./data/index".into());

    match cli.command {
        Commands::Ingest {
            corpus,
            init,
            min_words,
            top_terms,
            stopwords,
        } => {
            let store = if init {
                Store::init(&data)?
            } else {
                Store::open(&data)?
            };
            let opts = IngestOptions {
                min_words,
                top_terms,
                stopwords: stopwords.map(|p| load_stopwords(&p)).transpose()?,
            };
            let report = run_ingest(PathBuf::from(corpus).as_path(), &store, &opts)?;
            println!(
                "ingested {} books ({} skipped), {} words, {} postings",
                report.books, report.skipped, report.words, report.postings
            );
        }
        Commands::Jaccard { threshold } => {
            let store = Store::open(&data)?;
            let report = run_jaccard(&store, threshold)?;
            println!("{} books, {} edges kept", report.books, report.edges);
        }
        Commands::Centrality {
            damping,
            max_iter,
            tolerance,
        } => {
            let store = Store::open(&data)?;
            let report = run_centrality(
                &store,
                PageRankParams {
                    damping,
                    max_iter,
                    tolerance,
                },
            )?;
            println!(
                "centrality for {} books over {} edges (pagerank: {} iterations{})",
                report.books,
                report.edges,
                report.pagerank_iterations,
                if report.converged { "" } else { ", NOT converged" }
            );
        }
        Commands::Search { query, regex, limit } => {
            let store = Store::open(&data)?;
            let hits = run_search(&store, &query, regex, limit)?;
            if hits.is_empty() {
                println!("no results");
            }
            for (i, hit) in hits.iter().enumerate() {
                println!(
                    "{:2}. [{}] {} - {} ({} occ.)",
                    i + 1,
                    hit.source.as_str(),
                    hit.title,
                    hit.author,
                    hit.match_count
                );
                if !hit.matched_words.is_empty() {
                    println!("     words: {}", hit.matched_words.join(", "));
                }
            }
        }
        Commands::Similar { book_id, limit } => {
            let store = Store::open(&data)?;
            let results = run_similar(&store, book_id, limit)?;
            if results.is_empty() {
                println!("no similar books");
            }
            for (book, similarity) in results {
                println!("{similarity:.4}  {} - {}", book.title, book.author);
            }
        }
        Commands::Stats => {
            let store = Store::open(&data)?;
            run_stats(&store)?;
        }
    }
    Ok(())
}

fn load_stopwords(path: &str) -> Result<HashSet<String>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading stopword file {path}"))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_lowercase())
        .collect())
}
