//! Language-model capability: a black-box structured-text transformation.
//!
//! The core never talks to a model endpoint directly. It runs typed
//! [`signature`] tasks against a [`LanguageModel`] handle injected at
//! construction time; the concrete [`groq::GroqClient`] adds bounded
//! exponential-backoff retry for transient failures and keeps an auditable
//! prompt/response trace. Nothing in the pipeline depends on that trace.

pub mod groq;
pub mod signature;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of one generation request, after any internal retry.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Rate limit or network blip — retried inside the client; only seen by
    /// callers when the retry budget is exhausted.
    #[error("transient generation failure: {0}")]
    Transient(String),

    /// Non-retryable request failure (bad credentials, invalid request).
    #[error("generation request failed: {0}")]
    Fatal(String),

    /// Retry budget spent without a successful response.
    #[error("generation retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// The model responded, but not with the structured output the task asked for.
    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// A text-generation capability: given a structured prompt, return raw model text.
///
/// Implementations own their retry policy. Every call is a suspension point and
/// may be cancelled by a caller-imposed timeout.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
