use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::model::{Book, CentralityRecord, JaccardEdge, Posting, TopTerm, Word};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreMeta {
    pub num_books: u32,
    pub created_at: String,
    pub version: u32,
}

/// File-per-table store under one data directory: the persistence adapter
/// the batch stages read from and write to, and the handoff point to the
/// serving layer.
///
/// Every save serializes the whole table and renames a temporary file over
/// the target, so a stage that dies mid-write never leaves a half-updated
/// table and never corrupts tables committed by earlier stages. Tables are
/// sorted vectors; re-running a stage on unchanged input rewrites
/// identical bytes.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("creating store directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// Recreate the data directory from scratch (the schema-init flag).
    pub fn init<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if root.exists() {
            fs::remove_dir_all(root)
                .with_context(|| format!("clearing store directory {}", root.display()))?;
        }
        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn books_path(&self) -> PathBuf {
        self.root.join("books.bin")
    }
    fn words_path(&self) -> PathBuf {
        self.root.join("words.bin")
    }
    fn postings_path(&self) -> PathBuf {
        self.root.join("postings.bin")
    }
    fn top_terms_path(&self) -> PathBuf {
        self.root.join("top_terms.bin")
    }
    fn jaccard_edges_path(&self) -> PathBuf {
        self.root.join("jaccard_edges.bin")
    }
    fn centrality_path(&self) -> PathBuf {
        self.root.join("book_centrality.bin")
    }
    fn meta_path(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn save_books(&self, rows: &[Book]) -> Result<()> {
        save_table(&self.books_path(), rows)
    }
    pub fn load_books(&self) -> Result<Vec<Book>> {
        load_table(&self.books_path())
    }

    pub fn save_words(&self, rows: &[Word]) -> Result<()> {
        save_table(&self.words_path(), rows)
    }
    pub fn load_words(&self) -> Result<Vec<Word>> {
        load_table(&self.words_path())
    }

    pub fn save_postings(&self, rows: &[Posting]) -> Result<()> {
        save_table(&self.postings_path(), rows)
    }
    pub fn load_postings(&self) -> Result<Vec<Posting>> {
        load_table(&self.postings_path())
    }

    pub fn save_top_terms(&self, rows: &[TopTerm]) -> Result<()> {
        save_table(&self.top_terms_path(), rows)
    }
    pub fn load_top_terms(&self) -> Result<Vec<TopTerm>> {
        load_table(&self.top_terms_path())
    }

    pub fn save_jaccard_edges(&self, rows: &[JaccardEdge]) -> Result<()> {
        save_table(&self.jaccard_edges_path(), rows)
    }
    pub fn load_jaccard_edges(&self) -> Result<Vec<JaccardEdge>> {
        load_table(&self.jaccard_edges_path())
    }

    pub fn save_centrality(&self, rows: &[CentralityRecord]) -> Result<()> {
        save_table(&self.centrality_path(), rows)
    }
    pub fn load_centrality(&self) -> Result<Vec<CentralityRecord>> {
        load_table(&self.centrality_path())
    }

    pub fn save_meta(&self, meta: &StoreMeta) -> Result<()> {
        let json = serde_json::to_string_pretty(meta)?;
        write_atomic(&self.meta_path(), json.as_bytes())
    }
    pub fn load_meta(&self) -> Result<StoreMeta> {
        let mut buf = String::new();
        File::open(self.meta_path())
            .with_context(|| format!("opening {}", self.meta_path().display()))?
            .read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }
}

fn save_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let bytes = bincode::serialize(rows)
        .with_context(|| format!("encoding {}", path.display()))?;
    write_atomic(path, &bytes)
}

fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    File::open(path)
        .with_context(|| format!("opening table {}", path.display()))?
        .read_to_end(&mut buf)?;
    bincode::deserialize(&buf).with_context(|| format!("decoding {}", path.display()))
}

/// Write to `<path>.tmp`, then rename over the target. The rename is the
/// commit point; readers only ever see the old or the new table.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)
        .with_context(|| format!("committing {}", path.display()))?;
    Ok(())
}
