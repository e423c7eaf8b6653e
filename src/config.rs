use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JotterConfig {
    pub assistant: AssistantConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssistantConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub diary_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of query-generation + retrieval rounds per question.
    pub max_hops: usize,
    /// Top-k passages fetched from the index on each hop.
    pub passages_per_hop: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Total wall-clock budget for transient-failure retries, in seconds.
    pub retry_budget_secs: u64,
}

impl Default for JotterConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let diary_path = default_jotter_dir()
            .join("project_diary.txt")
            .to_string_lossy()
            .into_owned();
        Self { diary_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_jotter_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_hops: 2,
            passages_per_hop: 3,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.1-8b-instant".into(),
            temperature: 0.0,
            max_tokens: 1000,
            retry_budget_secs: 120,
        }
    }
}

/// Returns `~/.jotter/`
pub fn default_jotter_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".jotter")
}

/// Returns the default config file path: `~/.jotter/config.toml`
pub fn default_config_path() -> PathBuf {
    default_jotter_dir().join("config.toml")
}

impl JotterConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            JotterConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (JOTTER_DIARY, JOTTER_MODEL, JOTTER_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("JOTTER_DIARY") {
            self.storage.diary_path = val;
        }
        if let Ok(val) = std::env::var("JOTTER_MODEL") {
            self.generation.model = val;
        }
        if let Ok(val) = std::env::var("JOTTER_LOG_LEVEL") {
            self.assistant.log_level = val;
        }
    }

    /// Resolve the diary file path, expanding `~` if needed.
    pub fn resolved_diary_path(&self) -> PathBuf {
        expand_tilde(&self.storage.diary_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
