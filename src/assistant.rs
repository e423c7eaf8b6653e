//! Facade wiring the diary store, passage index, and language model together.
//!
//! The front end (CLI chat loop) talks only to [`DiaryAssistant`]: ask a
//! question, add an entry, summarize, classify. Every dependency is injected at
//! construction time — the index is built once at startup and shared by
//! reference, never lazily constructed behind the caller's back.

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::config::JotterConfig;
use crate::diary::{DiaryEntry, DiaryStore, DATE_FORMAT};
use crate::embedding::EmbeddingProvider;
use crate::error::AssistantError;
use crate::index::PassageIndex;
use crate::lm::signature::{
    predict, DetermineInputType, GenerateEntrySummary, MakeAnswerFriendly,
};
use crate::lm::LanguageModel;
use crate::pipeline::{Prediction, QaPipeline};

/// Routing category for free-form chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// A question about the project — goes through the retrieval loop.
    Question,
    /// A diary entry — appended to the store and indexed.
    Entry,
    /// Anything else.
    Something,
}

impl InputType {
    /// Tolerant mapping from model output. Anything unrecognized is `Something`.
    pub fn from_model_output(raw: &str) -> Self {
        let raw = raw.to_lowercase();
        if raw.contains("question") {
            Self::Question
        } else if raw.contains("entry") {
            Self::Entry
        } else {
            Self::Something
        }
    }
}

/// The assistant core: diary persistence, derived passage index, and the
/// question-answering pipeline behind one handle.
pub struct DiaryAssistant {
    diary: DiaryStore,
    index: Arc<PassageIndex>,
    lm: Arc<dyn LanguageModel>,
    pipeline: QaPipeline,
}

impl DiaryAssistant {
    /// Open the diary, build the passage index, and embed the whole existing
    /// corpus before the first search.
    pub async fn new(
        config: &JotterConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        lm: Arc<dyn LanguageModel>,
    ) -> Result<Self, AssistantError> {
        let diary = DiaryStore::new(config.resolved_diary_path());
        let entries = diary.read_all_entries().map_err(AssistantError::Diary)?;

        let index = tokio::task::spawn_blocking(move || -> anyhow::Result<PassageIndex> {
            let index = PassageIndex::open(embedder)?;
            index.bulk_load(&entries)?;
            Ok(index)
        })
        .await
        .map_err(|e| AssistantError::Index(anyhow::anyhow!("index build task failed: {e}")))?
        .map_err(AssistantError::Index)?;
        let index = Arc::new(index);

        let pipeline = QaPipeline::new(
            Arc::clone(&index),
            Arc::clone(&lm),
            config.retrieval.max_hops,
            config.retrieval.passages_per_hop,
        );

        Ok(Self {
            diary,
            index,
            lm,
            pipeline,
        })
    }

    /// Answer a question about the diary.
    ///
    /// Runs the multi-hop retrieval loop, then rewrites the short factoid answer
    /// as a friendly sentence. The returned context is the evidence the answer
    /// was grounded in.
    pub async fn answer_question(&self, question: &str) -> Result<Prediction, AssistantError> {
        let prediction = self.pipeline.forward(question).await?;
        let helpful = predict(
            self.lm.as_ref(),
            &MakeAnswerFriendly {
                question: question.to_string(),
                original_answer: prediction.answer.clone(),
            },
        )
        .await?;
        Ok(Prediction {
            context: prediction.context,
            answer: helpful,
        })
    }

    /// Persist a diary entry and index it. Defaults to today's date; a second
    /// entry on the same date is concatenated in the file but indexed as a new
    /// passage.
    pub async fn add_entry(
        &self,
        text: &str,
        date: Option<NaiveDate>,
    ) -> Result<NaiveDate, AssistantError> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        self.diary
            .append_entry(text, date)
            .map_err(AssistantError::Diary)?;

        let entry = DiaryEntry {
            date,
            text: text.to_string(),
        };
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.insert(&entry))
            .await
            .map_err(|e| AssistantError::Index(anyhow::anyhow!("index task failed: {e}")))?
            .map_err(AssistantError::Index)?;

        Ok(date)
    }

    /// Summarize a single entry's text.
    pub async fn summarize_entry(&self, text: &str) -> Result<String, AssistantError> {
        Ok(predict(
            self.lm.as_ref(),
            &GenerateEntrySummary {
                entry: text.to_string(),
            },
        )
        .await?)
    }

    /// Summarize every entry into a markdown document of `### date` sections.
    pub async fn summarize_all(&self) -> Result<String, AssistantError> {
        let entries = self.diary.read_all_entries().map_err(AssistantError::Diary)?;
        let mut out = String::new();
        for entry in entries {
            let summary = self.summarize_entry(&entry.text).await?;
            out.push_str(&format!(
                "### {}\n\n{}\n\n",
                entry.date.format(DATE_FORMAT),
                summary
            ));
        }
        Ok(out)
    }

    /// Classify free-form input for chat routing.
    pub async fn classify(&self, text: &str) -> Result<InputType, AssistantError> {
        let raw = predict(
            self.lm.as_ref(),
            &DetermineInputType {
                text: text.to_string(),
            },
        )
        .await?;
        Ok(InputType::from_model_output(&raw))
    }

    pub fn index(&self) -> &Arc<PassageIndex> {
        &self.index
    }
}
