//! Shared BibTeX file that fetched entries are appended to.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::ScholarError;
use crate::parser::{compile_static_regex, extract_citekey, split_bibtex_entries};

static BLANK_LINE_RUN: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"\n{3,}"));

/// Result of [`BibFile::append_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// An entry with the same text or citekey is already in the file.
    AlreadyPresent,
    /// Nothing to write.
    Empty,
}

#[derive(Debug, Clone)]
pub struct BibFile {
    path: PathBuf,
}

impl BibFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<String, ScholarError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(error) => Err(ScholarError::io(&self.path, error)),
        }
    }

    /// Appends `entry`, separated from existing content by a blank line.
    /// The file is created when missing.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read or written.
    #[instrument(skip(self, entry), fields(path = %self.path.display()))]
    pub async fn append_entry(&self, entry: &str) -> Result<AppendOutcome, ScholarError> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Ok(AppendOutcome::Empty);
        }

        let existing = self.read().await?;
        let citekey = extract_citekey(entry);
        let duplicate = split_bibtex_entries(&existing).iter().any(|present| {
            present == entry
                || citekey
                    .as_deref()
                    .is_some_and(|key| extract_citekey(present).as_deref() == Some(key))
        });
        if duplicate {
            debug!(citekey = citekey.as_deref().unwrap_or(""), "entry already in bib file");
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let separator = if existing.trim().is_empty() || existing.ends_with("\n\n") {
            ""
        } else if existing.ends_with('\n') {
            "\n"
        } else {
            "\n\n"
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|error| ScholarError::io(&self.path, error))?;
        file.write_all(format!("{separator}{entry}\n").as_bytes())
            .await
            .map_err(|error| ScholarError::io(&self.path, error))?;
        file.flush()
            .await
            .map_err(|error| ScholarError::io(&self.path, error))?;

        info!(citekey = citekey.as_deref().unwrap_or(""), "entry appended to bib file");
        Ok(AppendOutcome::Appended)
    }

    /// Finds the entry whose citekey equals `citekey` (case-insensitive).
    ///
    /// # Errors
    ///
    /// `Io` when the file exists but cannot be read.
    pub async fn find_entry(&self, citekey: &str) -> Result<Option<String>, ScholarError> {
        let wanted = citekey.trim().to_lowercase();
        let content = self.read().await?;
        Ok(split_bibtex_entries(&content).into_iter().find(|entry| {
            extract_citekey(entry).is_some_and(|key| key.to_lowercase() == wanted)
        }))
    }

    /// Removes every entry whose citekey is in `citekeys` and returns how many
    /// were removed. The file is only rewritten when something changed.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read or written.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn remove_entries(&self, citekeys: &[&str]) -> Result<usize, ScholarError> {
        let wanted: Vec<String> = citekeys.iter().map(|key| key.trim().to_lowercase()).collect();
        let mut content = self.read().await?;
        let mut removed = 0;

        for entry in split_bibtex_entries(&content) {
            let matches = extract_citekey(&entry)
                .is_some_and(|key| wanted.contains(&key.to_lowercase()));
            if matches && content.contains(&entry) {
                content = content.replacen(&entry, "", 1);
                removed += 1;
            }
        }

        if removed > 0 {
            let cleaned = BLANK_LINE_RUN.replace_all(content.trim_start(), "\n\n");
            tokio::fs::write(&self.path, cleaned.as_bytes())
                .await
                .map_err(|error| ScholarError::io(&self.path, error))?;
            info!(removed, "entries removed from bib file");
        }
        Ok(removed)
    }
}
