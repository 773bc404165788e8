//! CLI type definitions: command enums and argument structs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use atlas_sync::CandidateOrder;

#[derive(Parser)]
#[command(name = "atlas-media")]
#[command(about = "Keep destination photos in the travel catalog valid", long_about = None)]
pub(crate) struct Cli {
    /// Catalog database (defaults to the platform data directory)
    #[arg(long, global = true, env = "ATLAS_MEDIA_DB")]
    pub db: Option<PathBuf>,

    /// Only show warnings and errors (suppress normal output)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Enable verbose/debug logging (timestamps + debug-level messages)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Selection arguments shared by `sync` and `audit`.
#[derive(Args, Clone)]
pub(crate) struct SelectArgs {
    /// Maximum number of entities to select
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Candidate ordering: featured, alphabetical or stalest
    #[arg(long)]
    pub order: Option<CandidateOrder>,

    /// Names to process first (comma-separated, substring match)
    #[arg(long, value_delimiter = ',')]
    pub featured: Option<Vec<String>>,

    /// Entities per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Pause between batches, in milliseconds
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,

    /// Concurrent lookups per batch (capped at the batch size)
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Write a per-entity log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Find, validate and store photos for entities with missing or bad media
    Sync {
        #[command(flatten)]
        select: SelectArgs,

        /// Maximum convergence passes
        #[arg(long)]
        max_passes: Option<u32>,

        /// Stop once this share of entities is valid or fixed (0.0 to 1.0)
        #[arg(long)]
        threshold: Option<f64>,

        /// Live-check trusted photos even when they were validated before
        #[arg(long)]
        revalidate: bool,

        /// Include entities whose media already looks trusted
        #[arg(long)]
        all: bool,

        /// Show candidates and search queries without calling the provider
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Live-check existing photos without searching or writing
    Audit {
        #[command(flatten)]
        select: SelectArgs,

        /// Only audit entities whose media fails the offline check
        #[arg(long)]
        needs_media: bool,
    },

    /// Load entities from a JSON or YAML file into the catalog
    Import {
        /// File containing a list of entities
        file: PathBuf,

        /// Validate the file without writing to the catalog
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Show photo coverage for the catalog
    Status,

    /// List recent sync and audit runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Manage Places API configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show current settings and their sources
    Show,

    /// Print the config file path
    Path,

    /// Save the Places API key to the config file
    SetKey {
        /// The API key
        key: String,
    },
}
