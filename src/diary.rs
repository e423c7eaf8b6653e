//! Flat-file diary persistence.
//!
//! The diary is a plain text file of date blocks. Each block starts with the
//! literal marker `Date:` followed by a `DD-MM-YYYY` date and the entry body, and
//! runs until the next marker. Appending on a date that already has a block
//! concatenates the new text into that block instead of creating a second one.
//! Records that do not match the marker format are skipped on load, not fatal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::warn;

/// Date format used in diary markers (e.g. `01-01-2024`).
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// One logical diary entry: all text recorded under a single date block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryEntry {
    pub date: NaiveDate,
    pub text: String,
}

/// Handle to the diary file. Cheap to construct; every operation re-reads the
/// file so the on-disk content stays the single source of truth.
#[derive(Debug, Clone)]
pub struct DiaryStore {
    path: PathBuf,
}

impl DiaryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed entry, in file order. A missing file is an empty
    /// diary, not an error.
    pub fn read_all_entries(&self) -> Result<Vec<DiaryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read diary at {}", self.path.display()))?;
        Ok(parse_entries(&content))
    }

    /// Append `text` under `date`. Creates the file (and parent directory) on
    /// first use; merges into the existing block when the date already exists.
    pub fn append_entry(&self, text: &str, date: NaiveDate) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let content = if self.path.exists() {
            std::fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read diary at {}", self.path.display()))?
        } else {
            String::new()
        };

        let marker = format!("Date: {}", date.format(DATE_FORMAT));
        let updated = if let Some(start) = content.find(&marker) {
            merge_into_block(&content, start, text)
        } else {
            let mut out = content;
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&marker);
            out.push_str(". ");
            out.push_str(text);
            out.push('\n');
            out
        };

        std::fs::write(&self.path, updated)
            .with_context(|| format!("failed to write diary at {}", self.path.display()))
    }

    /// Full text of the entry recorded under `date`, if any.
    pub fn entry_for_date(&self, date: NaiveDate) -> Result<Option<String>> {
        Ok(self
            .read_all_entries()?
            .into_iter()
            .find(|e| e.date == date)
            .map(|e| e.text))
    }

    /// All dates that have an entry, in file order.
    pub fn dates(&self) -> Result<Vec<NaiveDate>> {
        Ok(self.read_all_entries()?.into_iter().map(|e| e.date).collect())
    }
}

/// Concatenate `text` into the date block beginning at byte offset `start`.
fn merge_into_block(content: &str, start: usize, text: &str) -> String {
    let end = content[start..]
        .find("\nDate:")
        .map(|i| start + i)
        .unwrap_or(content.len());
    let head = content[..end].trim_end_matches('\n');
    let tail = content[end..].trim_start_matches('\n');
    if tail.is_empty() {
        format!("{head}\n{text}\n")
    } else {
        format!("{head}\n{text}\n{tail}")
    }
}

/// Parse raw diary file content into entries, skipping malformed blocks.
pub fn parse_entries(content: &str) -> Vec<DiaryEntry> {
    let mut entries = Vec::new();
    for block in content.split("Date:") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        match parse_block(block) {
            Some(entry) => entries.push(entry),
            None => warn!(block = %preview(block), "skipping malformed diary block"),
        }
    }
    entries
}

/// Parse one block body (everything after a `Date:` marker, trimmed).
fn parse_block(block: &str) -> Option<DiaryEntry> {
    let date_str = block.get(..10)?;
    let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).ok()?;
    let text = block[10..]
        .trim_start_matches(|c| c == '.' || c == ' ')
        .trim()
        .to_string();
    Some(DiaryEntry { date, text })
}

fn preview(block: &str) -> &str {
    let cut = block
        .char_indices()
        .nth(40)
        .map(|(i, _)| i)
        .unwrap_or(block.len());
    &block[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn parses_blocks_in_file_order() {
        let content = "Date: 02-01-2024. Second day.\nDate: 01-01-2024. First day.\n";
        let entries = parse_entries(content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, date("02-01-2024"));
        assert_eq!(entries[0].text, "Second day.");
        assert_eq!(entries[1].date, date("01-01-2024"));
    }

    #[test]
    fn skips_malformed_blocks() {
        let content = "Date: not-a-date. Garbage.\nDate: 03-03-2024. Kept.\n";
        let entries = parse_entries(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Kept.");
    }

    #[test]
    fn multiline_block_keeps_inner_newlines() {
        let content = "Date: 05-05-2024. First text\nSecond text\n";
        let entries = parse_entries(content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "First text\nSecond text");
    }

    #[test]
    fn merge_appends_inside_existing_block() {
        let content = "Date: 05-05-2024. First.\nDate: 06-05-2024. Other.\n";
        let merged = merge_into_block(content, 0, "Second.");
        assert_eq!(merged, "Date: 05-05-2024. First.\nSecond.\nDate: 06-05-2024. Other.\n");
    }

    #[test]
    fn merge_appends_at_end_of_file() {
        let content = "Date: 05-05-2024. First.\n";
        let merged = merge_into_block(content, 0, "Second.");
        assert_eq!(merged, "Date: 05-05-2024. First.\nSecond.\n");
    }
}
