//! CLI for generating slide decks from Config and Slides tables.

mod fetch;
mod stores;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use deckgen_core::assembler::{deck_title, generate_deck_titled};
use deckgen_core::store::{read_config, read_slides};
use deckgen_core::sync::{backup_timestamp, SyncEndpoint, UpdateSynchronizer};
use deckgen_core::validate::{validate_slides, ConfigSummary};
use deckgen_core::{Deck, Error, GeneratedDeck};
use deckgen_pptx::{PptxReader, PptxWriter};
use fetch::ReqwestFetcher;
use std::path::{Path, PathBuf};
use stores::{default_state_path, DirAssetStore, DirTableStore, JsonStateStore};

/// Generate slide decks from Config and Slides tables.
#[derive(Parser, Debug)]
#[command(name = "deckgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding Config.csv and Slides.csv
    #[arg(short, long, env = "DECKGEN_TABLES", default_value = ".", global = true)]
    tables: PathBuf,

    /// Directory searched for chart and image files (default: the tables directory)
    #[arg(short, long, env = "DECKGEN_ASSETS", global = true)]
    assets: Option<PathBuf>,

    /// File holding the locally known data version
    #[arg(long, env = "DECKGEN_STATE", global = true)]
    state: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the full deck
    Generate {
        /// Output .pptx file (default: derived from the deck title, next to the tables)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a deck containing only the first slide
    Sample {
        /// Output .pptx file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check slides for missing titles and media references
    Validate,

    /// Summarize the loaded configuration
    Config,

    /// Compare local data with the remote feed without changing anything
    PreviewUpdate(EndpointArgs),

    /// Back up the tables and replace them with the remote feed
    ApplyUpdate(EndpointArgs),

    /// Show generator and data versions
    Version(EndpointArgs),

    /// Print the text outline of a .pptx file
    Inspect {
        /// Presentation to read
        file: PathBuf,

        /// Print the outline as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Where the update feed lives.
#[derive(Args, Debug)]
struct EndpointArgs {
    /// Feed repository owner
    #[arg(long, env = "DECKGEN_OWNER", default_value = "willscott-v2")]
    owner: String,

    /// Feed repository name
    #[arg(long, env = "DECKGEN_REPO", default_value = "smx-oct-slides")]
    repo: String,

    /// Feed branch
    #[arg(long, env = "DECKGEN_BRANCH", default_value = "main")]
    branch: String,

    /// Full base URL of the feed, overriding owner/repo/branch
    #[arg(long, env = "DECKGEN_FEED_URL")]
    feed_url: Option<String>,

    /// Data version assumed when none has been stored yet
    #[arg(long, default_value = "1.2.1")]
    default_version: String,
}

impl EndpointArgs {
    fn endpoint(&self) -> SyncEndpoint {
        let endpoint = SyncEndpoint::new(&self.owner, &self.repo, &self.branch)
            .with_default_version(&self.default_version);
        match &self.feed_url {
            Some(url) => endpoint.with_base_url(url),
            None => endpoint,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match &cli.command {
        Command::Generate { output } => generate(&cli, output.as_deref(), false),
        Command::Sample { output } => generate(&cli, output.as_deref(), true),
        Command::Validate => validate(&cli),
        Command::Config => show_config(&cli),
        Command::PreviewUpdate(endpoint) => preview_update(&cli, endpoint),
        Command::ApplyUpdate(endpoint) => apply_update(&cli, endpoint),
        Command::Version(endpoint) => show_version(&cli, endpoint),
        Command::Inspect { file, json } => inspect(file, *json),
    }
}

impl Cli {
    fn table_store(&self) -> DirTableStore {
        DirTableStore::new(&self.tables)
    }

    fn asset_store(&self) -> DirAssetStore {
        DirAssetStore::new(self.assets.as_ref().unwrap_or(&self.tables))
    }

    fn state_store(&self) -> JsonStateStore {
        JsonStateStore::new(self.state.clone().unwrap_or_else(default_state_path))
    }
}

/// Turn a deck title into a safe file stem.
fn file_stem_for(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if stem.is_empty() {
        "presentation".to_string()
    } else {
        stem.to_string()
    }
}

/// Build the deck (or just its first slide) and save it as .pptx.
fn generate(cli: &Cli, output: Option<&Path>, first_only: bool) -> Result<()> {
    let tables = cli.table_store();
    let config = read_config(&tables).context("Failed to load configuration")?;
    let mut slides = read_slides(&tables).context("Failed to load slides")?;

    let title = if first_only {
        slides.truncate(1);
        format!("TEST_SingleSlide_{}", backup_timestamp(Utc::now()))
    } else {
        deck_title(&config, chrono::Local::now().date_naive())
    };

    let generated = generate_deck_titled(Deck::default(), &cli.asset_store(), &slides, &config, &title)
        .context("Failed to start presentation")?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => tables.dir().join(format!("{}.pptx", file_stem_for(&generated.title))),
    };
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    PptxWriter::new()
        .with_application(concat!("deckgen ", env!("CARGO_PKG_VERSION")))
        .save(&generated.document, &output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    print_summary(&generated, &output_path, cli.verbose);
    Ok(())
}

fn print_summary(generated: &GeneratedDeck<Deck>, output_path: &Path, verbose: bool) {
    println!("Presentation created: {}", generated.title);
    println!(
        "{} of {} slides created successfully",
        generated.success_count, generated.total_count
    );
    for failure in generated.failures() {
        println!(
            "  Slide {} ({}) failed: {}",
            failure.index,
            failure.title,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    let diagnostics: Vec<_> = generated.diagnostics().collect();
    if !diagnostics.is_empty() {
        println!("{} cosmetic issues (run with --verbose for details)", diagnostics.len());
        if verbose {
            for diagnostic in diagnostics {
                eprintln!("  {}", diagnostic);
            }
        }
    }
    println!("Saved to: {}", output_path.display());
}

fn validate(cli: &Cli) -> Result<()> {
    let slides = read_slides(&cli.table_store()).context("Validation error")?;
    let report = validate_slides(&slides);
    println!("{}", report);
    Ok(())
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = read_config(&cli.table_store()).context("Config test failed")?;
    println!("{}", ConfigSummary::from_config(&config));
    log::debug!("Full config: {}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn synchronizer(endpoint: &EndpointArgs) -> Result<UpdateSynchronizer<ReqwestFetcher>> {
    let fetcher = ReqwestFetcher::new()?;
    Ok(UpdateSynchronizer::new(endpoint.endpoint(), fetcher))
}

fn preview_update(cli: &Cli, endpoint: &EndpointArgs) -> Result<()> {
    let report = synchronizer(endpoint)?.preview(&cli.table_store(), &cli.state_store());
    println!("{}", report);
    println!();
    println!("This was a preview only. Run `deckgen apply-update` to apply changes.");
    Ok(())
}

fn apply_update(cli: &Cli, endpoint: &EndpointArgs) -> Result<()> {
    let mut tables = cli.table_store();
    let mut state = cli.state_store();

    let report = match synchronizer(endpoint)?.apply(&mut tables, &mut state) {
        Ok(report) => report,
        Err(e @ Error::BackupError(_)) => {
            return Err(e).context("Update aborted before any change was made");
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", report);
    if !report.succeeded() {
        anyhow::bail!("Update did not complete");
    }
    Ok(())
}

fn show_version(cli: &Cli, endpoint: &EndpointArgs) -> Result<()> {
    let sync = synchronizer(endpoint)?;
    println!("Generator version: {}", env!("CARGO_PKG_VERSION"));
    println!("Data version:      {}", sync.local_version(&cli.state_store()));
    println!("Feed:              {}", sync.endpoint().base_url());
    Ok(())
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    let outline = PptxReader::new()
        .open(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
    } else {
        print!("{}", outline);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem_for() {
        assert_eq!(file_stem_for("Q3 Review: Wins/Losses"), "Q3 Review_ Wins_Losses");
        assert_eq!(file_stem_for("  ..  "), "presentation");
        assert_eq!(file_stem_for("Presentation - 2025-10-03"), "Presentation - 2025-10-03");
    }

    #[test]
    fn test_cli_parses_endpoint_overrides() {
        let cli = Cli::try_parse_from([
            "deckgen",
            "--tables",
            "data",
            "preview-update",
            "--feed-url",
            "http://localhost:8000/feed",
        ])
        .unwrap();

        assert_eq!(cli.tables, PathBuf::from("data"));
        match cli.command {
            Command::PreviewUpdate(args) => {
                assert_eq!(args.endpoint().version_url(), "http://localhost:8000/feed/version.json");
                assert_eq!(args.endpoint().default_version, "1.2.1");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
