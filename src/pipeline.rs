//! Multi-hop retrieval-augmented question answering.
//!
//! A question runs through a fixed number of hops. Each hop asks the language
//! model for a search query informed by the evidence collected so far, retrieves
//! the top-k most similar passages, and merges them into the context with
//! order-preserving deduplication. The final answer is generated from the full
//! context. The loop runs every configured hop — there is no early-exit
//! convergence check; the fixed bound keeps worst-case latency predictable.
//!
//! Hops are strictly sequential: each hop's query depends on the context
//! accumulated by the ones before it. Any index or generation failure aborts the
//! whole invocation; no partial answer is ever returned.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::AssistantError;
use crate::index::PassageIndex;
use crate::lm::signature::{predict, GenerateAnswer, GenerateQuery};
use crate::lm::{GenerationError, LanguageModel};

/// Order-preserving merge of two passage sequences, dropping exact-text repeats.
///
/// The result is `existing` followed by each element of `incoming` not already
/// seen, keeping the relative order of first occurrence across both inputs.
/// O(n) via a seen-set.
pub fn dedupe(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(incoming.iter())
        .filter(|p| seen.insert(p.as_str()))
        .cloned()
        .collect()
}

/// Result of one question-answering invocation: the accumulated evidence and the
/// short factoid answer generated from it.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub context: Vec<String>,
    pub answer: String,
}

/// Query generator for a single hop.
///
/// Each hop owns a distinct instance so later hops can specialize on what to
/// search given evidence already collected, independent of earlier hops'
/// phrasing.
struct QueryGenerator {
    hop: usize,
}

impl QueryGenerator {
    fn new(hop: usize) -> Self {
        Self { hop }
    }

    async fn generate(
        &self,
        lm: &dyn LanguageModel,
        context: &[String],
        question: &str,
    ) -> Result<String, GenerationError> {
        let query = predict(
            lm,
            &GenerateQuery {
                context: context.to_vec(),
                question: question.to_string(),
            },
        )
        .await?;
        debug!(hop = self.hop, query = %query, "generated search query");
        Ok(query)
    }
}

/// The multi-hop retrieval loop.
///
/// Holds a shared passage index and language-model handle; per-invocation state
/// (the retrieval context) lives on the stack of [`QaPipeline::forward`] and is
/// never shared across requests.
pub struct QaPipeline {
    index: Arc<PassageIndex>,
    lm: Arc<dyn LanguageModel>,
    query_generators: Vec<QueryGenerator>,
    passages_per_hop: usize,
}

impl QaPipeline {
    pub fn new(
        index: Arc<PassageIndex>,
        lm: Arc<dyn LanguageModel>,
        max_hops: usize,
        passages_per_hop: usize,
    ) -> Self {
        Self {
            index,
            lm,
            query_generators: (0..max_hops).map(QueryGenerator::new).collect(),
            passages_per_hop,
        }
    }

    pub fn max_hops(&self) -> usize {
        self.query_generators.len()
    }

    /// Answer a question: `max_hops` rounds of query-generation + retrieval +
    /// dedup, then final answer generation over the accumulated context.
    ///
    /// With zero hops this degenerates to direct answer generation over an empty
    /// context. Sparse retrieval results are used as-is; duplicates across hops
    /// are absorbed by [`dedupe`].
    pub async fn forward(&self, question: &str) -> Result<Prediction, AssistantError> {
        let mut context: Vec<String> = Vec::new();

        for generator in &self.query_generators {
            let query = generator
                .generate(self.lm.as_ref(), &context, question)
                .await?;
            let passages = self.retrieve(query).await?;
            context = dedupe(&context, &passages);
            debug!(
                hop = generator.hop,
                context_len = context.len(),
                "hop complete"
            );
        }

        let answer = predict(
            self.lm.as_ref(),
            &GenerateAnswer {
                context: context.clone(),
                question: question.to_string(),
            },
        )
        .await?;

        Ok(Prediction { context, answer })
    }

    async fn retrieve(&self, query: String) -> Result<Vec<String>, AssistantError> {
        let index = Arc::clone(&self.index);
        let k = self.passages_per_hop;
        tokio::task::spawn_blocking(move || index.search(&query, k))
            .await
            .map_err(|e| AssistantError::Index(anyhow::anyhow!("search task failed: {e}")))?
            .map_err(AssistantError::Index)
    }
}
