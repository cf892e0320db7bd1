//! Precomputed nearest-neighbor index.
//!
//! The index is a batch artifact: [`NeighborIndex::build`] runs the
//! similarity engine once over a completed fingerprint store and persists
//! every qualifying pair, then the serving process opens the result
//! read-only with [`NeighborIndex::open`] and answers per-identifier
//! queries without recomputing any score.
//!
//! # Layout
//! - `neighbors`: `query\0hit` -> little-endian f64 score. Each unordered
//!   pair is stored in both directions so one forward prefix scan answers
//!   either identifier.
//! - `members`: one empty-valued row per identifier present at build time.
//!   Distinguishes "known identifier, no qualifying hits" (empty result)
//!   from "unknown identifier" (Not-Found error).
//! - `meta`: build provenance: `number_of_bits`, the build cutoff, and an
//!   RFC 3339 build timestamp.

use chrono::{DateTime, Utc};
use rocksdb::{
    Cache, ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB,
};
use std::cmp::Ordering;
use std::path::Path;

use fragbits_core::similarity::{batch_scores, corrections, mean_onbit_density};
use tracing::{debug, info};

use crate::column_families::{cf_names, index_descriptors};
use crate::error::{StoreError, StoreResult};
use crate::fingerprint_store::DEFAULT_CACHE_SIZE;
use crate::store::FingerprintStorage;

/// Separator between the two identifiers of a pair key. Identifiers are
/// validated NUL-free before they reach this layer.
const PAIR_SEPARATOR: u8 = 0;

/// Meta CF keys.
const NUMBER_OF_BITS_KEY: &[u8] = b"number_of_bits";
const CUTOFF_KEY: &[u8] = b"cutoff";
const BUILT_AT_KEY: &[u8] = b"built_at";

/// One query result: a neighboring fragment and its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub score: f64,
}

/// Outcome of a [`NeighborIndex::build`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    /// Fragments read from the store (index members).
    pub fragments: usize,
    /// Unordered pairs at or above the build cutoff.
    pub pairs: usize,
}

/// Read-only handle to a built nearest-neighbor index.
///
/// Dropping the handle releases the underlying storage.
pub struct NeighborIndex {
    db: DB,
    /// Shared block cache, kept alive for the DB lifetime.
    #[allow(dead_code)]
    cache: Cache,
    path: String,
}

impl NeighborIndex {
    /// Score a completed store and persist the result at `path`.
    ///
    /// Derives the correction pair from the store's own mean on-bit
    /// density, scores every unordered pair once across worker threads,
    /// and keeps pairs scoring at or above `cutoff`. An empty store builds
    /// an empty index.
    ///
    /// # Errors
    /// - [`StoreError::BitCountUnset`] when the store has no
    ///   `number_of_bits`
    /// - [`StoreError::Unscorable`] when the stored value is unusable
    /// - [`StoreError::IndexExists`] when `path` already holds an index
    /// - [`StoreError::InvalidId`] when a store identifier contains NUL
    pub fn build<P, S>(path: P, store: &S, cutoff: f64) -> StoreResult<BuildSummary>
    where
        P: AsRef<Path>,
        S: FingerprintStorage + ?Sized,
    {
        let path_str = path.as_ref().to_string_lossy().to_string();
        if path.as_ref().join("CURRENT").exists() {
            return Err(StoreError::IndexExists { path: path_str });
        }

        let number_of_bits = store.number_of_bits()?.ok_or(StoreError::BitCountUnset)?;
        let entries: Vec<_> = store.materialize()?.into_iter().collect();
        for (id, _) in &entries {
            if id.as_bytes().contains(&PAIR_SEPARATOR) {
                return Err(StoreError::InvalidId { id: id.clone() });
            }
        }

        let pairs = if entries.is_empty() {
            Vec::new()
        } else {
            let density = mean_onbit_density(entries.iter().map(|(_, fp)| fp), number_of_bits)?;
            let corr = corrections(density);
            debug!(
                fragments = entries.len(),
                density,
                corr_on = corr.corr_on,
                corr_off = corr.corr_off,
                "scoring fingerprint pairs"
            );
            batch_scores(&entries, &entries, number_of_bits, corr, cutoff, true)
        };

        let cache = Cache::new_lru_cache(DEFAULT_CACHE_SIZE);
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let db = DB::open_cf_descriptors(&db_opts, &path_str, index_descriptors(&cache)).map_err(
            |e| StoreError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            },
        )?;

        let cf_neighbors = index_cf(&db, cf_names::NEIGHBORS)?;
        let cf_members = index_cf(&db, cf_names::MEMBERS)?;
        let cf_meta = index_cf(&db, cf_names::META)?;

        let mut batch = WriteBatch::default();
        for (id, _) in &entries {
            batch.put_cf(cf_members, id.as_bytes(), []);
        }
        for pair in &pairs {
            let score = pair.score.to_le_bytes();
            batch.put_cf(cf_neighbors, pair_key(&pair.left, &pair.right), score);
            batch.put_cf(cf_neighbors, pair_key(&pair.right, &pair.left), score);
        }
        batch.put_cf(cf_meta, NUMBER_OF_BITS_KEY, number_of_bits.to_le_bytes());
        batch.put_cf(cf_meta, CUTOFF_KEY, cutoff.to_le_bytes());
        batch.put_cf(
            cf_meta,
            BUILT_AT_KEY,
            Utc::now().to_rfc3339().as_bytes(),
        );

        db.write(batch)
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        for cf_name in cf_names::INDEX_ALL {
            let cf = index_cf(&db, cf_name)?;
            db.flush_cf(cf)
                .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        }

        let summary = BuildSummary {
            fragments: entries.len(),
            pairs: pairs.len(),
        };
        info!(
            path = path_str,
            fragments = summary.fragments,
            pairs = summary.pairs,
            cutoff,
            "built neighbor index"
        );
        Ok(summary)
    }

    /// Open a built index read-only for the serving lifetime.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let cache = Cache::new_lru_cache(DEFAULT_CACHE_SIZE);
        let db_opts = Options::default();

        let db = DB::open_cf_descriptors_read_only(
            &db_opts,
            &path_str,
            index_descriptors(&cache),
            false,
        )
        .map_err(|e| StoreError::OpenFailed {
            path: path_str.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            db,
            cache,
            path: path_str,
        })
    }

    /// The database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the identifier was present in the store at build time.
    pub fn contains(&self, id: &str) -> StoreResult<bool> {
        let cf = self.cf(cf_names::MEMBERS)?;
        let found = self
            .db
            .get_pinned_cf(cf, id.as_bytes())
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .is_some();
        Ok(found)
    }

    /// All neighbors of `query_id` scoring at or above `cutoff`, best
    /// first, truncated to `limit` entries (`None` keeps all).
    ///
    /// Scores tie-break on neighbor identifier so the order is
    /// deterministic.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] when `query_id` was not in the store the
    ///   index was built from
    pub fn find(
        &self,
        query_id: &str,
        cutoff: f64,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Neighbor>> {
        if !self.contains(query_id)? {
            return Err(StoreError::NotFound {
                id: query_id.to_string(),
            });
        }

        let cf = self.cf(cf_names::NEIGHBORS)?;
        let mut prefix = Vec::with_capacity(query_id.len() + 1);
        prefix.extend_from_slice(query_id.as_bytes());
        prefix.push(PAIR_SEPARATOR);

        let mut hits = Vec::new();
        for item in self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let hit_id = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|_| StoreError::Corrupt {
                    id: query_id.to_string(),
                    message: "pair key is not valid UTF-8".to_string(),
                })?
                .to_string();
            let score = decode_score(&value, &hit_id)?;

            if score >= cutoff {
                hits.push(Neighbor { id: hit_id, score });
            }
        }

        hits.sort_by(|x, y| {
            y.score
                .partial_cmp(&x.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| x.id.cmp(&y.id))
        });
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    /// Count of unordered pairs persisted at build time.
    pub fn pair_count(&self) -> StoreResult<usize> {
        let cf = self.cf(cf_names::NEIGHBORS)?;
        let mut directed = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            directed += 1;
        }
        Ok(directed / 2)
    }

    /// Universe size recorded at build time.
    pub fn number_of_bits(&self) -> StoreResult<u32> {
        let bytes = self.meta_value(NUMBER_OF_BITS_KEY)?;
        let word: [u8; 4] = bytes.as_slice().try_into().map_err(|_| StoreError::Corrupt {
            id: "meta:number_of_bits".to_string(),
            message: format!("expected 4 bytes, got {}", bytes.len()),
        })?;
        Ok(u32::from_le_bytes(word))
    }

    /// Score cutoff the index was built with.
    pub fn build_cutoff(&self) -> StoreResult<f64> {
        let bytes = self.meta_value(CUTOFF_KEY)?;
        let word: [u8; 8] = bytes.as_slice().try_into().map_err(|_| StoreError::Corrupt {
            id: "meta:cutoff".to_string(),
            message: format!("expected 8 bytes, got {}", bytes.len()),
        })?;
        Ok(f64::from_le_bytes(word))
    }

    /// When the index was built.
    pub fn built_at(&self) -> StoreResult<DateTime<Utc>> {
        let bytes = self.meta_value(BUILT_AT_KEY)?;
        let text = std::str::from_utf8(&bytes).map_err(|_| StoreError::Corrupt {
            id: "meta:built_at".to_string(),
            message: "timestamp is not valid UTF-8".to_string(),
        })?;
        DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt {
                id: "meta:built_at".to_string(),
                message: e.to_string(),
            })
    }

    fn cf(&self, name: &str) -> StoreResult<&ColumnFamily> {
        index_cf(&self.db, name)
    }

    fn meta_value(&self, key: &[u8]) -> StoreResult<Vec<u8>> {
        let cf = self.cf(cf_names::META)?;
        self.db
            .get_cf(cf, key)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .ok_or_else(|| StoreError::Corrupt {
                id: format!("meta:{}", String::from_utf8_lossy(key)),
                message: "missing build metadata".to_string(),
            })
    }
}

// =========================================================================
// Key and value helpers
// =========================================================================

/// Composite pair key: `query` + NUL + `hit`.
#[inline]
fn pair_key(query: &str, hit: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(query.len() + 1 + hit.len());
    key.extend_from_slice(query.as_bytes());
    key.push(PAIR_SEPARATOR);
    key.extend_from_slice(hit.as_bytes());
    key
}

/// Decode a little-endian f64 score value.
#[inline]
fn decode_score(bytes: &[u8], hit_id: &str) -> StoreResult<f64> {
    let word: [u8; 8] = bytes.try_into().map_err(|_| StoreError::Corrupt {
        id: hit_id.to_string(),
        message: format!("expected 8 score bytes, got {}", bytes.len()),
    })?;
    Ok(f64::from_le_bytes(word))
}

fn index_cf<'a>(db: &'a DB, name: &str) -> StoreResult<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| StoreError::ColumnFamilyNotFound {
            name: name.to_string(),
        })
}
