//! `fragbits import`: load fingerprints from a text file into a store.
//!
//! Input format, one record per line:
//!
//! ```text
//! <frag_id> <position> <position> ...
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. The whole file is
//! loaded inside a bulk-load session.

use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;

use fragbits_core::{Config, Fingerprint};
use fragbits_storage::{BulkLoadSession, FingerprintStore};

#[derive(Args)]
pub struct ImportArgs {
    /// Fingerprint store directory (defaults to the configured path)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Universe size shared by every fingerprint in the file
    #[arg(long)]
    pub number_of_bits: u32,

    /// Fingerprint file to load
    pub file: PathBuf,
}

pub fn run(args: ImportArgs, config: &Config) -> anyhow::Result<()> {
    let store_path = args
        .store
        .unwrap_or_else(|| config.storage.fingerprints_path.clone());

    let store = FingerprintStore::open(&store_path)?;
    store.set_number_of_bits(args.number_of_bits)?;

    let file = File::open(&args.file)
        .with_context(|| format!("cannot open fingerprint file {}", args.file.display()))?;
    let reader = BufReader::new(file);

    let session = BulkLoadSession::begin(&store)?;
    let mut imported = 0_usize;
    for (line_nr, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let id = fields
            .next()
            .with_context(|| format!("line {}: missing fragment identifier", line_nr + 1))?;
        let positions: Vec<u32> = fields
            .map(str::parse)
            .collect::<Result<_, _>>()
            .with_context(|| format!("line {}: invalid bit position", line_nr + 1))?;

        store.put(id, &Fingerprint::from_positions(positions))?;
        imported += 1;
    }
    session.finish()?;

    info!(
        count = imported,
        store = %store_path.display(),
        number_of_bits = args.number_of_bits,
        "fingerprint import finished"
    );
    println!(
        "Imported {imported} fingerprints into {}",
        store_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_import_file() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("fingerprints.txt");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "# header comment").unwrap();
        writeln!(file, "2n2k_MTN_frag1 1 2 3").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "2n2k_MTN_frag2 1 2 4 8").unwrap();
        drop(file);

        let store_path = tmp.path().join("store");
        let args = ImportArgs {
            store: Some(store_path.clone()),
            number_of_bits: 100,
            file: file_path,
        };
        run(args, &Config::default()).unwrap();

        let store = FingerprintStore::open(&store_path).unwrap();
        assert_eq!(store.number_of_bits().unwrap(), Some(100));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(
            store.get("2n2k_MTN_frag2").unwrap(),
            Fingerprint::from_positions([1, 2, 4, 8])
        );
    }

    #[test]
    fn test_import_rejects_malformed_position() {
        let tmp = TempDir::new().unwrap();
        let file_path = tmp.path().join("fingerprints.txt");
        std::fs::write(&file_path, "frag1 1 two 3\n").unwrap();

        let args = ImportArgs {
            store: Some(tmp.path().join("store")),
            number_of_bits: 100,
            file: file_path,
        };
        let result = run(args, &Config::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("line 1"));
    }
}
