#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use jotter::diary::{DiaryEntry, DATE_FORMAT};
use jotter::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use jotter::index::PassageIndex;
use jotter::lm::{GenerationError, LanguageModel};

/// Parse a DD-MM-YYYY test date.
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
}

pub fn entry(date_str: &str, text: &str) -> DiaryEntry {
    DiaryEntry {
        date: date(date_str),
        text: text.to_string(),
    }
}

/// Deterministic embedder: a unit spike at a position derived from the text
/// hash. Identical texts get identical vectors; call count is tracked so tests
/// can assert how often the index embedded something.
pub struct SpikeEmbedder {
    calls: AtomicUsize,
}

impl SpikeEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for SpikeEmbedder {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[(hasher.finish() % EMBEDDING_DIM as u64) as usize] = 1.0;
        Ok(v)
    }
}

/// Open an in-memory passage index over a spike embedder, pre-loaded with the
/// given entries. Returns the embedder too so tests can inspect call counts.
pub fn index_with(entries: &[DiaryEntry]) -> (Arc<PassageIndex>, Arc<SpikeEmbedder>) {
    let embedder = Arc::new(SpikeEmbedder::new());
    let index = PassageIndex::open(embedder.clone()).unwrap();
    index.bulk_load(entries).unwrap();
    (Arc::new(index), embedder)
}

/// Scripted language model: returns canned replies in order and records every
/// prompt. Running out of script is a fatal generation error.
pub struct ScriptedLm {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLm {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::Fatal("script exhausted".into()))
    }
}

/// A language model that never responds — for caller-timeout tests.
pub struct HangingLm;

#[async_trait]
impl LanguageModel for HangingLm {
    async fn complete(&self, _prompt: &str) -> Result<String, GenerationError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}
