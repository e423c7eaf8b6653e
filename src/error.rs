//! Classified failures surfaced by the assistant core.
//!
//! The core's contract is "succeed with answer+context, or fail with a classified
//! error" — the front end decides how to render each class for the user.

use thiserror::Error;

use crate::lm::GenerationError;

/// Terminal failure of one assistant invocation.
///
/// A question-answering invocation never partially answers: any hop failure
/// discards accumulated context and surfaces exactly one of these variants.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The generation capability failed (retry budget already exhausted inside it).
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Embedding model or vector store unreachable — fatal for the invocation.
    #[error("embedding index unavailable")]
    Index(#[source] anyhow::Error),

    /// The diary file could not be read or written.
    #[error("diary store failure")]
    Diary(#[source] anyhow::Error),
}
