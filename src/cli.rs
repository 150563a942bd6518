//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve paper metadata and reconcile it with a local notes library.
///
/// Scholar turns arXiv / ACL Anthology / Semantic Scholar URLs, citation
/// strings and titles into one canonical record and checks whether the paper
/// is already in your notes.
#[derive(Parser, Debug)]
#[command(name = "scholar")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a paper's metadata from a URL, citation string or title.
    Fetch {
        /// Paper URL, bibliography string, BibTeX entry or title
        input: String,

        /// Semantic Scholar API key (falls back to config, then S2_API_KEY)
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Notes folder to check for an existing copy after fetching
        #[arg(long, value_name = "DIR")]
        library: Option<PathBuf>,

        /// Bibliography file to append the BibTeX entry to
        #[arg(long, value_name = "FILE")]
        bib: Option<PathBuf>,

        /// Tag to attach to the record (repeatable)
        #[arg(long, action = clap::ArgAction::Append)]
        tag: Vec<String>,
    },

    /// Check whether a paper is already in the notes folder.
    Check {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        citekey: Option<String>,

        /// Free-text citation to recover a URL or title from
        #[arg(long, value_name = "TEXT")]
        bib_string: Option<String>,

        /// Author name for the author tier (repeatable)
        #[arg(long, action = clap::ArgAction::Append)]
        author: Vec<String>,

        /// Enable the author matching tier
        #[arg(long)]
        match_authors: bool,

        /// Notes folder (falls back to `note_folder` in config)
        #[arg(long, value_name = "DIR")]
        library: Option<PathBuf>,
    },

    /// Search Semantic Scholar by free text (top 5).
    Search {
        query: String,

        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// List the papers cited by a paper (up to 50).
    References {
        url: String,

        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },
}
