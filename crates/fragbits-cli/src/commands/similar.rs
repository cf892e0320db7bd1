//! `fragbits similar`: query a built index, one JSON hit per line.

use clap::Args;
use std::path::PathBuf;

use fragbits_core::Config;
use fragbits_service::SimilarityService;

#[derive(Args)]
pub struct SimilarArgs {
    /// Neighbor index directory (defaults to the configured path)
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Query fragment identifier
    pub query: String,

    /// Minimum similarity score to report
    #[arg(long, default_value_t = 0.55)]
    pub cutoff: f64,

    /// Maximum number of hits (all when omitted)
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn run(args: SimilarArgs, config: &Config) -> anyhow::Result<()> {
    let index_path = args
        .index
        .unwrap_or_else(|| config.storage.neighbors_path.clone());

    let service = SimilarityService::open(&index_path)?;
    let hits = service.similar_fragments(&args.query, args.cutoff, args.limit)?;

    for hit in &hits {
        println!("{}", serde_json::to_string(hit)?);
    }
    service.close();
    Ok(())
}
