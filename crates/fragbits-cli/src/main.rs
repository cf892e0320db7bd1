//! Fragbits CLI
//!
//! Operational entry points for the fingerprint similarity pipeline.
//!
//! # Commands
//!
//! - `import`: load fingerprints from a text file into a store
//! - `pairs`: score a completed store and build the neighbor index
//! - `similar`: query a built index, one JSON hit per line
//!
//! Paths and the build cutoff default to the loaded configuration
//! (`config/*.toml` and `FRAGBITS__` environment variables, or `--config`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use fragbits_core::Config;

mod commands;

/// Fragbits - fragment fingerprint similarity tools
#[derive(Parser)]
#[command(name = "fragbits")]
#[command(version)]
#[command(about = "Import fragment fingerprints, build and query the similarity index")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file (defaults to the layered config sources)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load fingerprints from a text file into a store
    Import(commands::import::ImportArgs),
    /// Score a completed store and build the neighbor index
    Pairs(commands::pairs::PairsArgs),
    /// Query a built index for similar fragments
    Similar(commands::similar::SimilarArgs),
}

fn init_tracing(verbose: u8, default_level: &str) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    init_tracing(cli.verbose, &config.logging.level);

    match cli.command {
        Commands::Import(args) => commands::import::run(args, &config),
        Commands::Pairs(args) => commands::pairs::run(args, &config),
        Commands::Similar(args) => commands::similar::run(args, &config),
    }
}
