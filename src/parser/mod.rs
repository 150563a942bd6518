//! Input parsing: paper URLs, free-text bibliography strings and BibTeX.
//!
//! - [`normalize_identifier`] classifies a URL into a [`Provider`] and id
//! - [`parse_bib_string`] recovers a URL / title from a citation string
//! - [`extract_citekey`] and [`split_bibtex_entries`] handle BibTeX text
//!
//! # Example
//!
//! ```
//! use scholar_core::parser::{Provider, normalize_identifier};
//!
//! let id = normalize_identifier("https://arxiv.org/abs/2301.00001").unwrap();
//! assert_eq!(id.provider(), Provider::Arxiv);
//! assert_eq!(id.provider_id(), "2301.00001");
//! ```

mod bibstring;
mod bibtex;
mod identifier;
mod url;

pub use bibstring::{BibStringHints, parse_bib_string};
pub use bibtex::{BibtexEntry, extract_citekey, parse_bibtex_entry, split_bibtex_entries};
pub use identifier::{PaperIdentifier, Provider, normalize_identifier};
pub use url::{find_first_url, is_valid_url};

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}
