//! Append-only passage index with top-k similarity search.
//!
//! Diary entries are embedded and stored in an in-memory SQLite database with a
//! sqlite-vec `vec0` virtual table. The index is rebuilt from the diary file at
//! startup ([`PassageIndex::bulk_load`]) — the flat file stays the single source
//! of truth, the index is a derived, append-only copy. There is no update or
//! delete path: a stale passage for an amended date is an accepted inconsistency.

use std::sync::{Mutex, Once};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use sqlite_vec::sqlite3_vec_init;
use std::sync::Arc;

use crate::diary::{DiaryEntry, DATE_FORMAT};
use crate::embedding::{EmbeddingProvider, EMBEDDING_DIM};

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS passages (
    id TEXT PRIMARY KEY,
    date TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// vec0 virtual table must be created separately (sqlite-vec syntax).
const VEC_TABLE_SQL: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS passages_vec USING vec0(
    id TEXT PRIMARY KEY,
    embedding FLOAT[384]
);
"#;

/// Render the searchable passage text for a diary entry.
///
/// The `Date:` header is kept inside the passage so generated answers can cite
/// when something happened.
pub fn passage_text(entry: &DiaryEntry) -> String {
    format!("Date: {}. {}", entry.date.format(DATE_FORMAT), entry.text)
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

/// Vector index over diary passages.
///
/// Inserts are serialized through the connection lock (single writer); searches
/// from concurrent requests take the same lock briefly and never observe a
/// half-written passage.
pub struct PassageIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl PassageIndex {
    /// Open an empty index backed by an in-memory database.
    pub fn open(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        load_sqlite_vec();
        let conn =
            Connection::open_in_memory().context("failed to open in-memory passage index")?;
        conn.execute_batch(SCHEMA_SQL)?;
        conn.execute_batch(VEC_TABLE_SQL)?;
        tracing::debug!(dims = EMBEDDING_DIM, "passage index initialized");
        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// Embed and index every entry of an existing diary corpus.
    ///
    /// Called once at startup, before the first search. Returns the number of
    /// passages indexed.
    pub fn bulk_load(&self, entries: &[DiaryEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = entries.iter().map(passage_text).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self
            .embedder
            .embed_batch(&refs)
            .context("failed to embed diary corpus")?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        for (entry, (text, embedding)) in entries.iter().zip(texts.iter().zip(&embeddings)) {
            insert_passage(&tx, entry, text, embedding)?;
        }
        tx.commit()?;

        tracing::info!(passages = entries.len(), "diary corpus indexed");
        Ok(entries.len())
    }

    /// Embed and append a single new entry. Never merges with prior passages,
    /// even for the same date.
    pub fn insert(&self, entry: &DiaryEntry) -> Result<()> {
        let text = passage_text(entry);
        let embedding = self
            .embedder
            .embed(&text)
            .context("failed to embed diary entry")?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        insert_passage(&tx, entry, &text, &embedding)?;
        tx.commit()?;

        tracing::debug!(date = %entry.date, "passage indexed");
        Ok(())
    }

    /// Top-k passages by semantic similarity to `query`, most similar first.
    ///
    /// Returns fewer than `k` passages when the corpus is sparse, and an empty
    /// sequence (not an error) when the index is empty.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let embedding = self
            .embedder
            .embed(query)
            .context("failed to embed search query")?;
        let embedding_bytes = embedding_to_bytes(&embedding);

        let conn = self.lock_conn()?;
        // KNN over the vec0 table first, then hydrate contents in rank order.
        let mut stmt = conn.prepare(
            "SELECT id FROM passages_vec WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let ids = stmt
            .query_map(params![embedding_bytes, k as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let mut content_stmt = conn.prepare("SELECT content FROM passages WHERE id = ?1")?;
        let mut passages = Vec::with_capacity(ids.len());
        for id in &ids {
            passages.push(content_stmt.query_row(params![id], |row| row.get(0))?);
        }

        Ok(passages)
    }

    /// Number of indexed passages.
    pub fn len(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM passages", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))
    }
}

fn insert_passage(
    tx: &rusqlite::Transaction,
    entry: &DiaryEntry,
    text: &str,
    embedding: &[f32],
) -> Result<()> {
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO passages (id, date, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, entry.date.format(DATE_FORMAT).to_string(), text, now],
    )?;
    tx.execute(
        "INSERT INTO passages_vec (id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    Ok(())
}
