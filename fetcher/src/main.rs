use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

use biblio_core::model::BookMeta;
use biblio_core::tokenizer::{normalize, word_count};

#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(about = "Download plain-text books from the Gutendex API into a corpus directory")]
struct Cli {
    /// Gutendex endpoint
    #[arg(long, default_value = "https://gutendex.com/books")]
    api: String,
    /// Comma-separated language codes to request
    #[arg(long, default_value = "en,fr")]
    languages: String,
    /// Stop once this many books are on disk
    #[arg(long, default_value_t = 2000)]
    target: usize,
    /// Discard books with fewer tokens than this after normalization
    #[arg(long, default_value_t = 10_000)]
    min_words: u64,
    /// Politeness delay between requests, in seconds
    #[arg(long, default_value_t = 1.0)]
    rate_secs: f64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    /// Retries per request on server errors
    #[arg(long, default_value_t = 3)]
    max_retries: usize,
    /// Corpus output directory
    #[arg(long, default_value = "./data/raw")]
    out_dir: String,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    next: Option<String>,
    results: Vec<ApiBook>,
}

#[derive(Debug, Deserialize)]
struct ApiBook {
    id: u64,
    title: Option<String>,
    #[serde(default)]
    authors: Vec<ApiAuthor>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    formats: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiAuthor {
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let out_dir = PathBuf::from(&args.out_dir);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating corpus directory {}", out_dir.display()))?;

    let client = reqwest::Client::builder()
        .user_agent("biblio-fetcher/0.1")
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let mut kept = existing_books(&out_dir)?;
    tracing::info!(kept, target = args.target, "resuming corpus download");
    if kept >= args.target {
        tracing::info!("target already reached, nothing to do");
        return Ok(());
    }

    let rate = Duration::from_secs_f64(args.rate_secs);
    let mut downloaded = 0usize;
    let mut page_url = Some(format!("{}?languages={}", args.api, args.languages));
    let mut page_failures = 0usize;

    while let Some(url) = page_url.take() {
        if kept >= args.target {
            break;
        }
        let page = match fetch_page(&client, &url, args.max_retries).await {
            Ok(page) => {
                page_failures = 0;
                page
            }
            Err(err) => {
                page_failures += 1;
                tracing::error!(%err, page_failures, "failed to fetch api page");
                if page_failures >= 3 {
                    break;
                }
                sleep(rate * 2).await;
                page_url = Some(url);
                continue;
            }
        };

        for book in &page.results {
            if kept >= args.target {
                break;
            }
            let Some(text_url) = pick_text_url(&book.formats) else {
                continue;
            };
            let title = book.title.clone().unwrap_or_else(|| "untitled".into());
            let text_path = out_dir.join(format!("pg_{}_{}.txt", book.id, slugify(&title)));
            if text_path.exists() {
                continue;
            }

            sleep(rate).await;
            match download_book(&client, text_url, &text_path, book, &title, args.min_words).await
            {
                Ok(true) => {
                    kept += 1;
                    downloaded += 1;
                    tracing::info!(
                        id = book.id,
                        title = %title,
                        kept,
                        target = args.target,
                        "saved"
                    );
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(id = book.id, %err, "download failed");
                }
            }
        }

        page_url = page.next;
        if page_url.is_some() {
            sleep(rate).await;
        }
    }

    tracing::info!(downloaded, kept, target = args.target, "fetch finished");
    if kept < args.target {
        tracing::warn!("target not reached; rerun to continue where this left off");
    }
    Ok(())
}

/// Count pg_*.txt files already on disk so reruns resume instead of
/// starting over.
fn existing_books(out_dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("pg_") && name.ends_with(".txt") {
            count += 1;
        }
    }
    Ok(count)
}

async fn fetch_page(client: &reqwest::Client, url: &str, max_retries: usize) -> Result<ApiPage> {
    let mut attempt = 0;
    loop {
        let result = client.get(url).send().await;
        match result {
            Ok(resp) if resp.status().is_server_error() && attempt < max_retries => {
                attempt += 1;
                let wait = Duration::from_secs(5 * attempt as u64);
                tracing::warn!(status = %resp.status(), attempt, "server error, retrying");
                sleep(wait).await;
            }
            Ok(resp) => {
                return Ok(resp.error_for_status()?.json::<ApiPage>().await?);
            }
            Err(err) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(%err, attempt, "request error, retrying");
                sleep(Duration::from_secs(5 * attempt as u64)).await;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Fetch one book body; returns Ok(true) when the book was kept. Texts are
/// stored already normalized, with a metadata sidecar for ingest.
async fn download_book(
    client: &reqwest::Client,
    text_url: &str,
    text_path: &Path,
    book: &ApiBook,
    title: &str,
    min_words: u64,
) -> Result<bool> {
    let raw = client
        .get(text_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let normalized = normalize(&raw);
    let words = word_count(&normalized);
    if words < min_words {
        tracing::debug!(id = book.id, words, min_words, "too short, discarded");
        return Ok(false);
    }

    fs::write(text_path, &normalized)
        .with_context(|| format!("writing {}", text_path.display()))?;

    let meta = BookMeta {
        gutenberg_id: Some(book.id),
        title: Some(title.to_string()),
        author: Some(
            book.authors
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown".into()),
        ),
        language: Some(
            book.languages
                .first()
                .cloned()
                .unwrap_or_else(|| "unknown".into()),
        ),
        cover_url: book.formats.get("image/jpeg").cloned(),
    };
    let sidecar = text_path.with_file_name(format!("pg_{}_meta.json", book.id));
    fs::write(&sidecar, serde_json::to_string(&meta)?)
        .with_context(|| format!("writing {}", sidecar.display()))?;
    Ok(true)
}

/// Prefer an uncompressed plain-text format.
fn pick_text_url(formats: &HashMap<String, String>) -> Option<&str> {
    for key in ["text/plain; charset=utf-8", "text/plain"] {
        if let Some(url) = formats.get(key) {
            if url.starts_with("http") && !url.ends_with(".zip") {
                return Some(url);
            }
        }
    }
    None
}

/// ASCII slug for filenames, at most 60 chars, never empty.
fn slugify(title: &str) -> String {
    let folded = normalize(title);
    let mut slug = String::new();
    let mut last_sep = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_sep = false;
        } else if !last_sep {
            slug.push('_');
            last_sep = true;
        }
        if slug.len() >= 60 {
            break;
        }
    }
    let slug = slug.trim_end_matches('_').to_string();
    if slug.is_empty() {
        "untitled".into()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_is_ascii_and_bounded() {
        assert_eq!(slugify("Moby-Dick; or, The Whale"), "moby_dick_or_the_whale");
        assert_eq!(slugify("Les Misérables"), "les_miserables");
        assert_eq!(slugify("!!!"), "untitled");
        assert!(slugify(&"x".repeat(200)).len() <= 60);
    }

    #[test]
    fn picks_plain_text_and_skips_archives() {
        let mut formats = HashMap::new();
        formats.insert("text/plain".to_string(), "https://x/1.zip".to_string());
        assert_eq!(pick_text_url(&formats), None);
        formats.insert(
            "text/plain; charset=utf-8".to_string(),
            "https://x/1.txt".to_string(),
        );
        assert_eq!(pick_text_url(&formats), Some("https://x/1.txt"));
    }
}
