//! Mastery CLI
//!
//! Command-line interface for the spaced repetition store.

mod commands;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mastery_core::{Quality, QualityError};
use tracing_subscriber::EnvFilter;

/// Mastery - spaced repetition for medical study decks
#[derive(Parser, Debug)]
#[command(name = "mastery")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Mastery spaced repetition store")]
#[command(long_about = "Mastery schedules study cards with an SM-2 derived algorithm.\n\nEach learner has their own interval, ease and streak per card; reviews are scored 0-5.")]
pub struct Cli {
    /// Directory holding mastery.db (defaults to $MASTERY_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of formatted text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a card to a deck and schedule it for its owner
    AddCard {
        /// Owner (learner) ID
        #[arg(long)]
        user: String,
        /// Deck ID
        #[arg(long)]
        deck: String,
        /// Prompt text
        #[arg(long)]
        front: String,
        /// Answer text
        #[arg(long, default_value = "")]
        back: String,
    },

    /// Score a review (quality 0-5; fractions are rounded)
    Review {
        #[arg(long)]
        user: String,
        #[arg(long)]
        card: String,
        #[arg(long, allow_hyphen_values = true, value_parser = parse_quality)]
        quality: Quality,
    },

    /// Score a review from a JSON request: {"cardId": "...", "quality": 4}
    Submit {
        #[arg(long)]
        user: String,
        /// Request body (read from stdin when omitted)
        request: Option<String>,
    },

    /// List cards due now, never-seen cards first
    Due {
        #[arg(long)]
        user: String,
        #[arg(long)]
        deck: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show what each quality score would do to a card's schedule
    Preview {
        #[arg(long)]
        user: String,
        #[arg(long)]
        card: String,
    },

    /// Show the review log for a card, newest first
    History {
        #[arg(long)]
        user: String,
        #[arg(long)]
        card: String,
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show a learner's progress summary
    Stats {
        #[arg(long)]
        user: String,
    },

    /// Delete a card along with all its schedules and review history
    DeleteCard {
        /// Card ID
        id: String,
    },
}

/// Validate a quality argument at the CLI boundary
fn parse_quality(s: &str) -> Result<Quality, String> {
    s.parse().map_err(|e: QualityError| e.to_string())
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);
    commands::run(cli)
}
