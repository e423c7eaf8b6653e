//! Groq-hosted language model client (OpenAI-compatible chat completions).
//!
//! Wraps one chat endpoint with JSON response mode, exponential-backoff retry on
//! transient failures (rate limits, 5xx, transport errors) bounded by a total
//! time budget, and a prompt/response history trace for inspection.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerationError, LanguageModel};
use crate::config::GenerationConfig;

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// One recorded prompt/response pair.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub prompt: String,
    pub response: String,
    pub elapsed_ms: u64,
}

/// Chat-completions client with retry and an auditable exchange history.
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry_budget: Duration,
    history: Mutex<Vec<Exchange>>,
}

impl GroqClient {
    /// Build a client from config. The API key is read from `GROQ_API_KEY`.
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("GROQ_API_KEY")
            .map_err(|_| anyhow::anyhow!("GROQ_API_KEY environment variable is not set"))?;
        Ok(Self::with_api_key(config, api_key))
    }

    pub fn with_api_key(config: &GenerationConfig, api_key: String) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry_budget: Duration::from_secs(config.retry_budget_secs),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Recorded prompt/response exchanges, oldest first.
    pub fn history(&self) -> Vec<Exchange> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    fn record(&self, prompt: &str, response: &str, elapsed: Duration) {
        if let Ok(mut history) = self.history.lock() {
            history.push(Exchange {
                prompt: prompt.to_string(),
                response: response.to_string(),
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
    }

    /// One request, no retry. Classifies failures into transient vs fatal.
    async fn request_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Transient(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Fatal(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("invalid response body: {e}")))?;

        if let Some(usage) = &chat.usage {
            debug!(total_tokens = usage.total_tokens, model = %self.model, "generation usage");
        }

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::Malformed("response had no choices".into()))
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let start = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.request_once(prompt).await {
                Ok(text) => {
                    self.record(prompt, &text, start.elapsed());
                    return Ok(text);
                }
                Err(GenerationError::Transient(last)) => {
                    if start.elapsed() + backoff >= self.retry_budget {
                        return Err(GenerationError::RetriesExhausted { attempts, last });
                    }
                    warn!(
                        attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %last,
                        "transient generation failure, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
