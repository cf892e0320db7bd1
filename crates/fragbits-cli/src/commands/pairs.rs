//! `fragbits pairs`: score a completed store and build the neighbor index.

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use fragbits_core::Config;
use fragbits_storage::{FingerprintStore, NeighborIndex};

#[derive(Args)]
pub struct PairsArgs {
    /// Fingerprint store directory (defaults to the configured path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Output directory for the neighbor index (defaults to the configured
    /// path)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Minimum similarity score to persist (defaults to the configured
    /// build cutoff)
    #[arg(long)]
    pub cutoff: Option<f64>,
}

pub fn run(args: PairsArgs, config: &Config) -> anyhow::Result<()> {
    let store_path = args
        .store
        .unwrap_or_else(|| config.storage.fingerprints_path.clone());
    let out_path = args
        .out
        .unwrap_or_else(|| config.storage.neighbors_path.clone());
    let cutoff = args.cutoff.unwrap_or(config.build.cutoff);

    let store = FingerprintStore::open(&store_path)?;
    let summary = NeighborIndex::build(&out_path, &store, cutoff)?;

    info!(
        store = %store_path.display(),
        index = %out_path.display(),
        fragments = summary.fragments,
        pairs = summary.pairs,
        cutoff,
        "pairs build finished"
    );
    println!(
        "Scored {} fragments, kept {} pairs at cutoff {cutoff} in {}",
        summary.fragments,
        summary.pairs,
        out_path.display()
    );
    Ok(())
}
