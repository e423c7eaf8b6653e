//! CLI front end: chat loop, direct commands, and model download.
//!
//! This is the user-facing collaborator — all formatting and routing lives here;
//! the assistant core only ever returns answers, summaries, and classified
//! errors.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::assistant::{DiaryAssistant, InputType};
use crate::diary::{DiaryStore, DATE_FORMAT};

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Parse a `DD-MM-YYYY` date argument.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("invalid date {s:?}, expected DD-MM-YYYY"))
}

/// Interactive chat loop: classify each line and route it.
pub async fn chat(assistant: &DiaryAssistant) -> Result<()> {
    println!("Project diary assistant. Type a diary entry or ask a question (Ctrl-D to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        // A failed turn shouldn't end the session.
        if let Err(e) = handle_line(assistant, &line).await {
            tracing::error!(error = %e, "chat turn failed");
            println!("Sorry, something went wrong with that one. Try again in a moment.");
        }
    }

    Ok(())
}

async fn handle_line(assistant: &DiaryAssistant, line: &str) -> Result<()> {
    match assistant.classify(line).await? {
        InputType::Question => {
            let prediction = assistant.answer_question(line).await?;
            println!("Answer: {}", prediction.answer);
        }
        InputType::Entry => {
            let date = assistant.add_entry(line, None).await?;
            println!("Diary entry added for {}.", date.format(DATE_FORMAT));
        }
        InputType::Something => {
            println!(
                "I can store diary entries or answer questions about the project. \
                 Try phrasing that as one of the two."
            );
        }
    }
    Ok(())
}

/// Answer one question and print it, optionally with the retrieved evidence.
pub async fn ask(assistant: &DiaryAssistant, question: &str, show_context: bool) -> Result<()> {
    let prediction = assistant.answer_question(question).await?;
    println!("{}", prediction.answer);
    if show_context {
        println!();
        if prediction.context.is_empty() {
            println!("(no passages retrieved)");
        }
        for passage in &prediction.context {
            println!("- {passage}");
        }
    }
    Ok(())
}

/// Append a diary entry, defaulting to today.
pub async fn add(assistant: &DiaryAssistant, text: &str, date: Option<&str>) -> Result<()> {
    let date = date.map(parse_date).transpose()?;
    let date = assistant.add_entry(text, date).await?;
    println!("Diary entry added for {}.", date.format(DATE_FORMAT));
    Ok(())
}

/// Print one entry by date, or list available dates when no date is given.
///
/// Reads the diary file directly — no model or API key needed.
pub fn show(diary: &DiaryStore, date: Option<&str>) -> Result<()> {
    let Some(date) = date else {
        let dates = diary.dates()?;
        if dates.is_empty() {
            println!("No entries found in the diary.");
        } else {
            println!("Available dates:");
            for d in dates {
                println!("  {}", d.format(DATE_FORMAT));
            }
        }
        return Ok(());
    };

    let date = parse_date(date)?;
    match diary.entry_for_date(date)? {
        Some(text) => println!("Entry for {}:\n\n{text}", date.format(DATE_FORMAT)),
        None => println!("No entry found for {}.", date.format(DATE_FORMAT)),
    }
    Ok(())
}

/// Summarize every entry into a markdown file.
pub async fn summary(assistant: &DiaryAssistant, out: &Path) -> Result<()> {
    println!("Generating summaries...");
    let markdown = assistant.summarize_all().await?;
    if markdown.is_empty() {
        println!("No entries found in the diary.");
        return Ok(());
    }
    std::fs::write(out, markdown)
        .with_context(|| format!("failed to write summary to {}", out.display()))?;
    println!("Summary written to {}.", out.display());
    Ok(())
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &crate::config::EmbeddingConfig) -> Result<()> {
    let cache_dir = crate::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    let model_path = cache_dir.join("model.onnx");
    let tokenizer_path = cache_dir.join("tokenizer.json");

    if model_path.exists() {
        println!("Model already exists at {}", model_path.display());
    } else {
        println!("Downloading model.onnx (~90MB)...");
        download_file(MODEL_URL, &model_path).await?;
        println!("Model saved to {}", model_path.display());
    }

    if tokenizer_path.exists() {
        println!("Tokenizer already exists at {}", tokenizer_path.display());
    } else {
        println!("Downloading tokenizer.json...");
        download_file(TOKENIZER_URL, &tokenizer_path).await?;
        println!("Tokenizer saved to {}", tokenizer_path.display());
    }

    println!("Model download complete. Ready for use.");
    Ok(())
}

/// Download a file from a URL with progress bar. Uses atomic write (tmp + rename).
async fn download_file(url: &str, dest: &PathBuf) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let total_size = response.content_length();
    let pb = if let Some(size) = total_size {
        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                .expect("valid template")
                .progress_chars("##-"),
        );
        pb
    } else {
        ProgressBar::new_spinner()
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }

    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_roundtrip() {
        let date = parse_date("05-05-2024").unwrap();
        assert_eq!(date.format(DATE_FORMAT).to_string(), "05-05-2024");
    }

    #[test]
    fn parse_date_rejects_iso_format() {
        assert!(parse_date("2024-05-05").is_err());
    }

    #[tokio::test]
    async fn download_streams_to_file_and_removes_temp() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let body = "hello model bytes";
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let dir = tempfile::TempDir::new().unwrap();
        let dest = dir.path().join("model.onnx");
        download_file(&format!("http://{addr}/model.onnx"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello model bytes");
        assert!(!dest.with_extension("tmp").exists());
    }
}
