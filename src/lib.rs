//! Conversational project-diary assistant with retrieval-augmented question answering.
//!
//! Jotter keeps a plain-text project diary and answers free-form questions about it.
//! Questions go through a multi-hop retrieval loop: each hop asks a language model
//! for a search query informed by the evidence gathered so far, retrieves the most
//! similar diary passages from a vector index, and merges them into the accumulated
//! context with order-preserving deduplication. The final answer is generated from
//! that context and rewritten into a friendly sentence before display.
//!
//! # Architecture
//!
//! - **Persistence**: a flat text file of `Date: DD-MM-YYYY` blocks — the single
//!   source of truth for diary content
//! - **Index**: in-memory SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search, rebuilt from the diary file at startup
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Generation**: an OpenAI-compatible chat endpoint (Groq by default) behind
//!   the [`lm::LanguageModel`] trait, with bounded exponential-backoff retry
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`diary`] — Flat-file diary store: parsing, appending, same-day merging
//! - [`embedding`] — Text-to-vector embedding pipeline via ONNX Runtime
//! - [`index`] — Append-only passage index with top-k similarity search
//! - [`lm`] — Language-model capability: task signatures, prompting, retry
//! - [`pipeline`] — The multi-hop retrieval loop and evidence deduplication
//! - [`assistant`] — Facade wiring diary, index, and language model together

pub mod assistant;
pub mod config;
pub mod diary;
pub mod embedding;
pub mod error;
pub mod index;
pub mod lm;
pub mod pipeline;
