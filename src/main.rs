//! CLI entry point for the scholar tool.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use scholar_core::{
    AppendOutcome, BibFile, HttpTimeouts, LibrarySearchQuery, MatchOptions,
    NoteLibrary, PaperRecord, RetryPolicy, Scholar, UpstreamClient, build_http_client,
};
use scholar_core::record::note_file_stem;
use serde::Serialize;
use tracing::{debug, info};

mod app_config;
mod cli;

use app_config::{FileConfig, load_config};
use cli::{Args, Command};

const API_KEY_ENV: &str = "S2_API_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_config(args.config.as_deref())?;
    let config = loaded.config;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => config
                .verbosity
                .map_or("info", app_config::VerbositySetting::default_level),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, config_path = ?loaded.path, from_file = loaded.loaded_from_file, "CLI arguments parsed");

    match args.command {
        Command::Fetch {
            input,
            api_key,
            library,
            bib,
            tag,
        } => {
            let scholar = build_scholar(&config, api_key)?;
            run_fetch(&scholar, &config, &input, library, bib, tag).await
        }
        Command::Check {
            url,
            title,
            citekey,
            bib_string,
            author,
            match_authors,
            library,
        } => {
            let Some(folder) = library.or_else(|| config.note_folder.clone()) else {
                bail!("No notes folder given. Pass --library or set `note_folder` in the config file");
            };
            let query = LibrarySearchQuery {
                url,
                title,
                citekey,
                bib_string,
                authors: author,
            };
            let mut options = match_options(&config);
            options.author_matching |= match_authors;

            let scholar = build_scholar(&config, None)?.with_match_options(options);
            let result = scholar
                .check_library_source(&query, &NoteLibrary::new(folder))
                .await?;
            info!(found = result.found, "library check complete");
            print_json(&result)
        }
        Command::Search { query, api_key } => {
            let scholar = build_scholar(&config, api_key)?;
            print_json(&scholar.search(&query).await?)
        }
        Command::References { url, api_key } => {
            let scholar = build_scholar(&config, api_key)?;
            print_json(&scholar.references(&url).await?)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchOutput {
    /// Suggested note file name for the record, relative to the notes folder.
    note_file: String,
    record: PaperRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing: Option<scholar_core::LibraryMatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bib_entry_appended: Option<bool>,
}

async fn run_fetch(
    scholar: &Scholar,
    config: &FileConfig,
    input: &str,
    library: Option<PathBuf>,
    bib: Option<PathBuf>,
    tags: Vec<String>,
) -> Result<()> {
    let (mut record, existing) = match library.or_else(|| config.note_folder.clone()) {
        Some(folder) => {
            let outcome = scholar
                .fetch_and_reconcile(input, &NoteLibrary::new(folder))
                .await?;
            (outcome.record, Some(outcome.existing))
        }
        None => (scholar.resolve_and_fetch(input).await?, None),
    };
    record.tags = tags;

    let mut bib_entry_appended = None;
    if let Some(path) = bib.or_else(|| config.bib_file.clone())
        && let Some(entry) = record.bibtex.as_deref()
    {
        let bib_file = BibFile::new(&path);
        let outcome = bib_file
            .append_entry(entry)
            .await
            .with_context(|| format!("Failed to update bibliography '{}'", path.display()))?;
        info!(?outcome, path = %path.display(), "bibliography updated");
        bib_entry_appended = Some(outcome == AppendOutcome::Appended);
    }

    print_json(&FetchOutput::new(record, existing, bib_entry_appended))
}

impl FetchOutput {
    fn new(
        record: PaperRecord,
        existing: Option<scholar_core::LibraryMatchResult>,
        bib_entry_appended: Option<bool>,
    ) -> Self {
        Self {
            note_file: format!("{}.md", note_file_stem(&record.title)),
            record,
            existing,
            bib_entry_appended,
        }
    }
}

fn build_scholar(config: &FileConfig, api_key: Option<String>) -> Result<Scholar> {
    let timeouts = HttpTimeouts {
        connect_timeout_secs: config
            .connect_timeout_secs
            .unwrap_or(scholar_core::upstream::CONNECT_TIMEOUT_SECS),
        read_timeout_secs: config
            .read_timeout_secs
            .unwrap_or(scholar_core::upstream::READ_TIMEOUT_SECS),
    };
    let mut policy = RetryPolicy::with_max_attempts(
        config
            .max_attempts
            .unwrap_or(scholar_core::upstream::DEFAULT_MAX_ATTEMPTS),
    );
    if let Some(base_delay_ms) = config.base_delay_ms {
        policy = policy.with_base_delay(Duration::from_millis(base_delay_ms));
    }

    let client = UpstreamClient::with_client(build_http_client(timeouts)?).with_policy(policy);
    let api_key = api_key
        .or_else(|| config.s2_api_key.clone())
        .or_else(|| std::env::var(API_KEY_ENV).ok());

    Ok(Scholar::with_client(client)
        .with_api_key(api_key)
        .with_match_options(match_options(config)))
}

fn match_options(config: &FileConfig) -> MatchOptions {
    let defaults = MatchOptions::default();
    MatchOptions {
        title_threshold: config
            .title_match_threshold
            .unwrap_or(defaults.title_threshold),
        author_matching: config.author_matching.unwrap_or(defaults.author_matching),
        ..defaults
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}
