mod assistant;
mod cli;
mod config;
mod diary;
mod embedding;
mod error;
mod index;
mod lm;
mod pipeline;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use assistant::DiaryAssistant;
use embedding::EmbeddingProvider;
use lm::groq::GroqClient;
use lm::LanguageModel;

#[derive(Parser)]
#[command(name = "jotter", version, about = "Conversational project-diary assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat: entries and questions are told apart automatically
    Chat,
    /// Ask one question about the diary
    Ask {
        question: String,
        /// Also print the retrieved passages the answer was grounded in
        #[arg(long)]
        context: bool,
    },
    /// Add a diary entry
    Add {
        text: String,
        /// Entry date as DD-MM-YYYY (defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Show one entry by date (DD-MM-YYYY), or list available dates
    Show { date: Option<String> },
    /// Summarize every entry into a markdown file
    Summary {
        /// Output path
        #[arg(long, default_value = "diary_summary.md")]
        out: PathBuf,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.jotter/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::JotterConfig::load()?;

    let filter = EnvFilter::try_new(&config.assistant.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat => {
            let assistant = build_assistant(&config).await?;
            cli::chat(&assistant).await?;
        }
        Command::Ask { question, context } => {
            let assistant = build_assistant(&config).await?;
            cli::ask(&assistant, &question, context).await?;
        }
        Command::Add { text, date } => {
            let assistant = build_assistant(&config).await?;
            cli::add(&assistant, &text, date.as_deref()).await?;
        }
        Command::Show { date } => {
            let diary = diary::DiaryStore::new(config.resolved_diary_path());
            cli::show(&diary, date.as_deref())?;
        }
        Command::Summary { out } => {
            let assistant = build_assistant(&config).await?;
            cli::summary(&assistant, &out).await?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}

/// Wire up the assistant: embedding provider, generation client, diary, index.
async fn build_assistant(config: &config::JotterConfig) -> Result<DiaryAssistant> {
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let client = GroqClient::new(&config.generation)?;
    tracing::info!(model = client.model(), "generation backend ready");
    let lm: Arc<dyn LanguageModel> = Arc::new(client);
    Ok(DiaryAssistant::new(config, embedder, lm).await?)
}
