//! BibTeX helpers: citekey extraction, entry splitting and field parsing.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::compile_static_regex;

/// `@type{key,` with the key captured up to the first comma.
static CITEKEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"@[^{@\n]*\{\s*([^,{}\s]+)\s*,"));

const IGNORED_BLOCK_TYPES: [&str; 3] = ["comment", "preamble", "string"];

/// A single parsed BibTeX entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibtexEntry {
    /// Lowercased entry type (`article`, `misc`, ...).
    pub entry_type: String,
    /// Citation key after `@type{`.
    pub key: String,
    /// Field values with outer braces/quotes removed, keyed by lowercase name.
    pub fields: HashMap<String, String>,
}

impl BibtexEntry {
    /// Returns a field value by (lowercase) name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Extracts the citation key from the first `@type{key,` clause.
///
/// Returns `None` when the text has no such clause.
///
/// ```
/// use scholar_core::parser::extract_citekey;
///
/// assert_eq!(
///     extract_citekey("@article{smith2020deep, title={Deep}}").as_deref(),
///     Some("smith2020deep")
/// );
/// assert_eq!(extract_citekey("no entry here"), None);
/// ```
#[must_use]
pub fn extract_citekey(bibtex: &str) -> Option<String> {
    CITEKEY_PATTERN
        .captures(bibtex)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str().to_string())
}

/// Splits BibTeX text into `@type{...}` entries using brace balancing.
///
/// Unterminated entries run to the next `@` at the start of a line.
#[must_use]
pub fn split_bibtex_entries(input: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut entries = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i].1 != '@' {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && chars[j].1.is_ascii_alphabetic() {
            j += 1;
        }
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }
        if j >= chars.len() || chars[j].1 != '{' {
            i += 1;
            continue;
        }

        let start = chars[i].0;
        match find_closing_brace(&chars, j) {
            Some(end_index) => {
                let end_exclusive = chars
                    .get(end_index + 1)
                    .map_or(input.len(), |(offset, _)| *offset);
                entries.push(input[start..end_exclusive].trim().to_string());
                i = end_index + 1;
            }
            None => {
                let next_line_start = (i + 1..chars.len()).find(|&k| {
                    chars[k].1 == '@' && matches!(chars[k - 1].1, '\n' | '\r')
                });
                match next_line_start {
                    Some(next) => {
                        entries.push(input[start..chars[next].0].trim().to_string());
                        i = next;
                    }
                    None => {
                        entries.push(input[start..].trim().to_string());
                        break;
                    }
                }
            }
        }
    }

    entries
}

fn find_closing_brace(chars: &[(usize, char)], open_index: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escape = false;

    for (k, (_, ch)) in chars.iter().enumerate().skip(open_index) {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' if depth == 1 => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses one `@type{key, field = value, ...}` entry.
///
/// Returns `None` for `@comment`/`@preamble`/`@string` blocks and for text that
/// is not a well-formed entry.
#[must_use]
pub fn parse_bibtex_entry(raw_entry: &str) -> Option<BibtexEntry> {
    let trimmed = raw_entry.trim();
    let after_at = &trimmed[trimmed.find('@')? + 1..];
    let brace_pos = after_at.find('{')?;

    let entry_type = after_at[..brace_pos].trim().to_ascii_lowercase();
    if entry_type.is_empty() || IGNORED_BLOCK_TYPES.contains(&entry_type.as_str()) {
        return None;
    }

    let body = after_at[brace_pos + 1..].strip_suffix('}')?;
    let (key_raw, fields_raw) = body.split_once(',').unwrap_or((body, ""));
    let key = key_raw.trim();
    if key.is_empty() {
        return None;
    }

    Some(BibtexEntry {
        entry_type,
        key: key.to_string(),
        fields: parse_fields(fields_raw)?,
    })
}

fn parse_fields(input: &str) -> Option<HashMap<String, String>> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
            continue;
        }
        match ch {
            '\\' => escape = true,
            '"' if depth == 0 => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => depth = depth.checked_sub(1)?,
            ',' if !in_quotes && depth == 0 => {
                let segment = current.trim();
                if !segment.is_empty() {
                    pairs.push(segment.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if in_quotes || depth != 0 {
        return None;
    }
    let tail = current.trim();
    if !tail.is_empty() {
        pairs.push(tail.to_string());
    }

    let mut fields = HashMap::new();
    for pair in pairs {
        let (name, value_raw) = pair.split_once('=')?;
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            return None;
        }
        // First value wins.
        fields
            .entry(name)
            .or_insert_with(|| strip_bibtex_value(value_raw));
    }
    Some(fields)
}

fn strip_bibtex_value(value: &str) -> String {
    let trimmed = value.trim();
    let inner = if trimmed.len() >= 2
        && ((trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('"') && trimmed.ends_with('"')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    // Inner braces protect capitalization in BibTeX; they carry no text.
    inner
        .chars()
        .filter(|ch| *ch != '{' && *ch != '}')
        .collect::<String>()
        .replace("\\\"", "\"")
        .trim()
        .to_string()
}
