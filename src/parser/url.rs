//! URL discovery and validation in free text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::compile_static_regex;

/// Matches http:// and https:// URLs up to whitespace or common delimiters.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"https?://[^\s<>"'\]]+"#));

/// Scheme, dotted host, optional path.
static VALID_URL: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"(?i)^https?://[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}(?::\d+)?(?:[/?#]\S*)?$")
});

/// Returns the first http(s) URL in `text` with trailing punctuation removed.
#[must_use]
pub fn find_first_url(text: &str) -> Option<String> {
    let found = URL_PATTERN.find(text)?;
    let cleaned = clean_url_trailing(found.as_str());
    trace!(url = cleaned, "found URL candidate");
    if cleaned.len() <= "https://".len() {
        return None;
    }
    Some(cleaned.to_string())
}

/// Returns true when `value` looks like an absolute web URL.
#[must_use]
pub fn is_valid_url(value: &str) -> bool {
    VALID_URL.is_match(value.trim())
}

/// Strips sentence punctuation and unbalanced closing brackets from a URL tail.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' | '}' => {
                let open = match last {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}
