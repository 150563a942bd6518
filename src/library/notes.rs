//! Markdown note folder as a [`LibrarySource`].
//!
//! Each `*.md` file under the root is one paper. Metadata comes from a YAML-style
//! frontmatter block delimited by `---` lines; only the subset notes actually
//! use is understood (scalars, quoted scalars, inline `[a, b]` lists, `- item`
//! lists and `|`/`>` block scalars).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{LibrarySource, LocalRecord};
use crate::error::ScholarError;
use crate::record::{PaperRecord, normalize_whitespace};

const NOTE_EXTENSION: &str = "md";
const FRONTMATTER_DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
enum FrontValue {
    Scalar(String),
    List(Vec<String>),
}

impl FrontValue {
    fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value.as_str()).filter(|value| !value.trim().is_empty()),
            Self::List(_) => None,
        }
    }

    fn into_items(self) -> Vec<String> {
        match self {
            Self::Scalar(value) => value
                .split(',')
                .map(normalize_whitespace)
                .filter(|item| !item.is_empty())
                .collect(),
            Self::List(items) => items,
        }
    }
}

/// Reads every note below `root` on each snapshot.
#[derive(Debug, Clone)]
pub struct NoteLibrary {
    root: PathBuf,
}

impl NoteLibrary {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn note_paths(&self) -> Result<Vec<PathBuf>, ScholarError> {
        let mut paths = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(error) if dir == self.root => return Err(ScholarError::io(&dir, error)),
                Err(error) => {
                    warn!(path = %dir.display(), error = %error, "Skipping unreadable note directory");
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(error) => {
                        warn!(error = %error, "Skipping unreadable directory entry");
                        break;
                    }
                };
                let file_type = match entry.file_type().await {
                    Ok(file_type) => file_type,
                    Err(error) => {
                        warn!(
                            path = %entry.path().display(),
                            error = %error,
                            "Skipping entry with unreadable file type"
                        );
                        continue;
                    }
                };

                let path = entry.path();
                if file_type.is_dir() {
                    if !entry.file_name().to_string_lossy().starts_with('.') {
                        stack.push(path);
                    }
                } else if path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(NOTE_EXTENSION))
                {
                    paths.push(path);
                }
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait]
impl LibrarySource for NoteLibrary {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn snapshot(&self) -> Result<Vec<LocalRecord>, ScholarError> {
        let mut records = Vec::new();
        for path in self.note_paths().await? {
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable note");
                    continue;
                }
            };
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            records.push(LocalRecord {
                path: self.relative_path(&path),
                record: parse_note(&content, &stem),
            });
        }
        debug!(count = records.len(), "note library snapshot taken");
        Ok(records)
    }
}

/// Builds a record from a note's text. `fallback_title` (usually the file
/// stem) is used when the frontmatter has no title.
#[must_use]
pub fn parse_note(content: &str, fallback_title: &str) -> PaperRecord {
    let mut fields = parse_frontmatter(content);
    let mut take_scalar = |keys: &[&str]| {
        keys.iter().find_map(|key| {
            fields
                .remove(*key)
                .and_then(|value| value.as_scalar().map(str::to_string))
        })
    };

    let title = take_scalar(&["title"]).unwrap_or_else(|| fallback_title.to_string());
    let url = take_scalar(&["url"]);
    let venue = take_scalar(&["venue"]);
    let publication_date = take_scalar(&["publicationDate", "date", "year"]);
    let abstract_text = take_scalar(&["abstract"]).unwrap_or_default();
    let pdf = take_scalar(&["pdf"]);
    let citekey = take_scalar(&["citekey"]);
    let bibtex = take_scalar(&["bibtex"]);

    let mut record = PaperRecord::new(Some(&title)).with_bibtex(bibtex);
    record.authors = fields
        .remove("authors")
        .map(FrontValue::into_items)
        .unwrap_or_default();
    record.tags = fields
        .remove("tags")
        .map(FrontValue::into_items)
        .unwrap_or_default()
        .into_iter()
        .map(|tag| tag.trim_start_matches('#').to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    record.abstract_text = normalize_whitespace(&abstract_text);
    record.url = url.map(|value| value.trim().to_string());
    record.venue = venue;
    record.publication_date = publication_date;
    record.pdf_path = pdf.map(|value| strip_wiki_link(&value));
    if let Some(citekey) = citekey {
        record.citekey = Some(citekey.trim().to_string());
    }
    record
}

fn strip_wiki_link(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('!')
        .unwrap_or(value)
        .strip_prefix("[[")
        .and_then(|inner| inner.strip_suffix("]]"))
        .unwrap_or(value)
        .trim()
        .to_string()
}

fn frontmatter_block(content: &str) -> Option<Vec<&str>> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != FRONTMATTER_DELIMITER {
        return None;
    }
    let mut block = Vec::new();
    for line in lines {
        if line.trim_end() == FRONTMATTER_DELIMITER {
            return Some(block);
        }
        block.push(line);
    }
    None
}

fn parse_frontmatter(content: &str) -> HashMap<String, FrontValue> {
    let mut fields = HashMap::new();
    let Some(lines) = frontmatter_block(content) else {
        return fields;
    };

    let mut index = 0;
    while index < lines.len() {
        let line = lines[index];
        index += 1;
        if line.starts_with([' ', '\t']) || line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, raw)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_string();
        let raw = raw.trim();

        let value = if raw.is_empty() {
            let mut items = Vec::new();
            while index < lines.len() {
                let Some(item) = lines[index].trim_start().strip_prefix("- ") else {
                    break;
                };
                items.push(unquote(item.trim()));
                index += 1;
            }
            FrontValue::List(items.into_iter().filter(|item| !item.is_empty()).collect())
        } else if matches!(raw, "|" | ">" | "|-" | ">-") {
            let mut block = Vec::new();
            while index < lines.len()
                && (lines[index].starts_with([' ', '\t']) || lines[index].trim().is_empty())
            {
                block.push(lines[index].trim());
                index += 1;
            }
            let separator = if raw.starts_with('|') { "\n" } else { " " };
            FrontValue::Scalar(block.join(separator).trim().to_string())
        } else if let Some(inner) = raw.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            FrontValue::List(
                inner
                    .split(',')
                    .map(|item| unquote(item.trim()))
                    .filter(|item| !item.is_empty())
                    .collect(),
            )
        } else {
            FrontValue::Scalar(unquote(raw))
        };
        fields.insert(key, value);
    }
    fields
}

fn unquote(value: &str) -> String {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}
