//! RocksDB fingerprint store.
//!
//! Persists an identifier -> fingerprint mapping plus one optional scalar,
//! `number_of_bits`, describing the bit universe shared by every entry.
//! Fingerprints are stored in the compact codec form from
//! `fragbits_core::codec`; identifiers are raw UTF-8 keys, so iteration
//! order is lexicographic and stable for the lifetime of the store.
//!
//! # Durability Profiles
//! Writes normally run with the write-ahead log enabled and a synchronous
//! flush per write. A [`crate::BulkLoadSession`] switches the store to a
//! throughput profile (no WAL, no sync) and restores the safe profile when
//! it ends; see `bulk_load.rs` for the guarantee.
//!
//! # Concurrency
//! Single writer at a time, any number of readers while no writer is
//! active. Coordination is external; this type only guards the durability
//! profile itself.

use parking_lot::Mutex;
use rocksdb::{
    Cache, ColumnFamily, DBIteratorWithThreadMode, Direction, IteratorMode, Options, WriteBatch,
    WriteOptions, DB,
};
use std::collections::BTreeMap;
use std::path::Path;

use fragbits_core::{codec, Fingerprint};

use crate::column_families::{cf_names, store_descriptors};
use crate::error::{StoreError, StoreResult};
use crate::store::FingerprintStorage;

/// Default block cache size: 64MB.
pub const DEFAULT_CACHE_SIZE: usize = 64 * 1024 * 1024;

/// Default maximum open files.
pub const DEFAULT_MAX_OPEN_FILES: i32 = 512;

/// Meta CF key holding the declared universe size.
const NUMBER_OF_BITS_KEY: &[u8] = b"number_of_bits";

/// Configuration options for [`FingerprintStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum open files (default: 512).
    pub max_open_files: i32,
    /// Block cache size in bytes (default: 64MB).
    pub block_cache_size: usize,
    /// Create the database if missing (default: true).
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            block_cache_size: DEFAULT_CACHE_SIZE,
            create_if_missing: true,
        }
    }
}

/// Active write durability profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Durability {
    /// WAL on, synchronous flush per write.
    Safe,
    /// WAL off, no synchronous flush. Only while a bulk-load session is
    /// active; the session flushes memtables when it ends.
    Bulk,
}

/// RocksDB-backed fingerprint store.
///
/// # Thread Safety
/// RocksDB's `DB` is internally thread-safe; this struct can be shared
/// across threads via `Arc<FingerprintStore>`.
///
/// # Example
/// ```rust,ignore
/// use fragbits_storage::FingerprintStore;
/// use fragbits_core::Fingerprint;
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let store = FingerprintStore::open(tmp.path())?;
/// store.set_number_of_bits(574_331)?;
/// store.put("2n2k_MTN_frag1", &Fingerprint::from_positions([1, 5, 9]))?;
/// ```
pub struct FingerprintStore {
    db: DB,
    /// Shared block cache, kept alive for the DB lifetime.
    #[allow(dead_code)]
    cache: Cache,
    path: String,
    durability: Mutex<Durability>,
}

impl FingerprintStore {
    /// Open a store at the given path with default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open a store with custom configuration.
    ///
    /// Creates the database and both column families when missing.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> StoreResult<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let cache = Cache::new_lru_cache(config.block_cache_size);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(config.create_if_missing);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);

        let db = DB::open_cf_descriptors(&db_opts, &path_str, store_descriptors(&cache)).map_err(
            |e| StoreError::OpenFailed {
                path: path_str.clone(),
                message: e.to_string(),
            },
        )?;

        Ok(Self {
            db,
            cache,
            path: path_str,
            durability: Mutex::new(Durability::Safe),
        })
    }

    /// The database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Flush all column families to SST files.
    pub fn flush(&self) -> StoreResult<()> {
        for cf_name in cf_names::STORE_ALL {
            let cf = self.cf(cf_name)?;
            self.db
                .flush_cf(cf)
                .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn cf(&self, name: &str) -> StoreResult<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound {
                name: name.to_string(),
            })
    }

    fn write_options(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        match *self.durability.lock() {
            Durability::Safe => {
                opts.set_sync(true);
            }
            Durability::Bulk => {
                opts.set_sync(false);
                opts.disable_wal(true);
            }
        }
        opts
    }

    /// Switch to the throughput profile. Fails when a session is already
    /// active.
    pub(crate) fn enter_bulk(&self) -> StoreResult<()> {
        let mut durability = self.durability.lock();
        if *durability == Durability::Bulk {
            return Err(StoreError::BulkLoadActive);
        }
        *durability = Durability::Bulk;
        Ok(())
    }

    /// Restore the safe profile and make buffered writes durable.
    pub(crate) fn exit_bulk(&self) -> StoreResult<()> {
        *self.durability.lock() = Durability::Safe;
        self.flush()
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// The declared universe size, or `None` until [`Self::set_number_of_bits`]
    /// has been called. Reads only the meta column family.
    pub fn number_of_bits(&self) -> StoreResult<Option<u32>> {
        let cf = self.cf(cf_names::META)?;
        let bytes = self
            .db
            .get_cf(cf, NUMBER_OF_BITS_KEY)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

        match bytes {
            None => Ok(None),
            Some(bytes) => {
                let word: [u8; 4] = bytes.as_slice().try_into().map_err(|_| StoreError::Corrupt {
                    id: "meta:number_of_bits".to_string(),
                    message: format!("expected 4 bytes, got {}", bytes.len()),
                })?;
                Ok(Some(u32::from_le_bytes(word)))
            }
        }
    }

    /// Set the declared universe size.
    pub fn set_number_of_bits(&self, number_of_bits: u32) -> StoreResult<()> {
        let cf = self.cf(cf_names::META)?;
        self.db
            .put_cf_opt(
                cf,
                NUMBER_OF_BITS_KEY,
                number_of_bits.to_le_bytes(),
                &self.write_options(),
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    /// Clear the declared universe size back to absent.
    ///
    /// Idempotent; stored fingerprints are untouched.
    pub fn clear_number_of_bits(&self) -> StoreResult<()> {
        let cf = self.cf(cf_names::META)?;
        self.db
            .delete_cf_opt(cf, NUMBER_OF_BITS_KEY, &self.write_options())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Count of stored entries.
    pub fn len(&self) -> StoreResult<usize> {
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item.map_err(|e| StoreError::ReadFailed(e.to_string()))?;
            count += 1;
        }
        Ok(count)
    }

    /// True when no entry is stored.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Membership test.
    pub fn contains(&self, id: &str) -> StoreResult<bool> {
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        let found = self
            .db
            .get_pinned_cf(cf, id.as_bytes())
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .is_some();
        Ok(found)
    }

    /// Fetch one fingerprint.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] carrying the identifier when absent
    /// - [`StoreError::Corrupt`] when the stored bytes fail to decode
    pub fn get(&self, id: &str) -> StoreResult<Fingerprint> {
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        let bytes = self
            .db
            .get_cf(cf, id.as_bytes())
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        codec::decode(&bytes).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            message: e.to_string(),
        })
    }

    /// Create or overwrite one entry.
    ///
    /// # Errors
    /// - [`StoreError::InvalidId`] when the identifier contains NUL
    pub fn put(&self, id: &str, fingerprint: &Fingerprint) -> StoreResult<()> {
        validate_id(id)?;
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        self.db
            .put_cf_opt(
                cf,
                id.as_bytes(),
                codec::encode(fingerprint),
                &self.write_options(),
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    /// Remove one entry.
    ///
    /// Deleting a missing identifier fails with [`StoreError::NotFound`],
    /// matching `get`.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        if !self.contains(id)? {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        self.db
            .delete_cf_opt(cf, id.as_bytes(), &self.write_options())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    /// Bulk-merge entries in one atomic write batch, overwriting on
    /// identifier collision.
    pub fn merge<I>(&self, entries: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (String, Fingerprint)>,
    {
        let cf = self.cf(cf_names::FINGERPRINTS)?;
        let mut batch = WriteBatch::default();
        for (id, fingerprint) in entries {
            validate_id(&id)?;
            batch.put_cf(cf, id.as_bytes(), codec::encode(&fingerprint));
        }
        self.db
            .write_opt(batch, &self.write_options())
            .map_err(|e| StoreError::WriteFailed(e.to_string()))
    }

    /// All identifiers in storage order (lexicographic, stable).
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in self.iter() {
            let (id, _) = entry?;
            keys.push(id);
        }
        Ok(keys)
    }

    /// Lazy iterator over all `(identifier, fingerprint)` entries, each
    /// exactly once, in key order.
    ///
    /// Restart by calling `iter()` again; dropping the iterator mid-way
    /// releases the underlying cursor.
    pub fn iter(&self) -> EntryIter<'_> {
        match self.cf(cf_names::FINGERPRINTS) {
            Ok(cf) => EntryIter {
                inner: Some(self.db.iterator_cf(cf, IteratorMode::Start)),
                prefix: None,
                pending_error: None,
            },
            Err(e) => EntryIter::failed(e),
        }
    }

    /// As [`Self::iter`], restricted to identifiers starting with `prefix`.
    ///
    /// Stops at the first key past the prefix range; lexicographically
    /// adjacent non-matching identifiers are never yielded.
    pub fn iter_prefix(&self, prefix: &str) -> EntryIter<'_> {
        let prefix_bytes = prefix.as_bytes().to_vec();
        match self.cf(cf_names::FINGERPRINTS) {
            Ok(cf) => EntryIter {
                inner: Some(
                    self.db
                        .iterator_cf(cf, IteratorMode::From(&prefix_bytes, Direction::Forward)),
                ),
                prefix: Some(prefix_bytes),
                pending_error: None,
            },
            Err(e) => EntryIter::failed(e),
        }
    }

    /// Lazy iterator over fingerprints only, in the same order as
    /// [`Self::iter`].
    pub fn values(&self) -> impl Iterator<Item = StoreResult<Fingerprint>> + '_ {
        self.iter().map(|entry| entry.map(|(_, fp)| fp))
    }

    /// Full in-memory snapshot, equal in content to iterating all entries.
    pub fn materialize(&self) -> StoreResult<BTreeMap<String, Fingerprint>> {
        self.iter().collect()
    }
}

impl FingerprintStorage for FingerprintStore {
    fn number_of_bits(&self) -> StoreResult<Option<u32>> {
        FingerprintStore::number_of_bits(self)
    }

    fn set_number_of_bits(&self, number_of_bits: u32) -> StoreResult<()> {
        FingerprintStore::set_number_of_bits(self, number_of_bits)
    }

    fn clear_number_of_bits(&self) -> StoreResult<()> {
        FingerprintStore::clear_number_of_bits(self)
    }

    fn len(&self) -> StoreResult<usize> {
        FingerprintStore::len(self)
    }

    fn contains(&self, id: &str) -> StoreResult<bool> {
        FingerprintStore::contains(self, id)
    }

    fn get(&self, id: &str) -> StoreResult<Fingerprint> {
        FingerprintStore::get(self, id)
    }

    fn put(&self, id: &str, fingerprint: &Fingerprint) -> StoreResult<()> {
        FingerprintStore::put(self, id, fingerprint)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        FingerprintStore::delete(self, id)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        FingerprintStore::keys(self)
    }

    fn materialize(&self) -> StoreResult<BTreeMap<String, Fingerprint>> {
        FingerprintStore::materialize(self)
    }
}

/// Lazy entry iterator over a fingerprint store.
///
/// Yields `StoreResult<(String, Fingerprint)>`; a corrupt record surfaces
/// as an error for that item without ending the iteration early.
pub struct EntryIter<'a> {
    inner: Option<DBIteratorWithThreadMode<'a, DB>>,
    prefix: Option<Vec<u8>>,
    pending_error: Option<StoreError>,
}

impl EntryIter<'_> {
    /// An iterator that yields one error and then ends.
    fn failed(error: StoreError) -> Self {
        EntryIter {
            inner: None,
            prefix: None,
            pending_error: Some(error),
        }
    }
}

impl Iterator for EntryIter<'_> {
    type Item = StoreResult<(String, Fingerprint)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending_error.take() {
            return Some(Err(e));
        }
        let inner = self.inner.as_mut()?;
        let item = inner.next()?;

        let (key, value) = match item {
            Ok(kv) => kv,
            Err(e) => return Some(Err(StoreError::ReadFailed(e.to_string()))),
        };

        if let Some(prefix) = &self.prefix {
            if !key.starts_with(prefix) {
                // Past the prefix range; release the cursor.
                self.inner = None;
                return None;
            }
        }

        let id = match String::from_utf8(key.into_vec()) {
            Ok(id) => id,
            Err(e) => {
                return Some(Err(StoreError::Corrupt {
                    id: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    message: "identifier is not valid UTF-8".to_string(),
                }))
            }
        };

        match codec::decode(&value) {
            Ok(fingerprint) => Some(Ok((id, fingerprint))),
            Err(e) => Some(Err(StoreError::Corrupt {
                id,
                message: e.to_string(),
            })),
        }
    }
}

/// Reject identifiers that cannot serve as neighbor index key components.
#[inline]
fn validate_id(id: &str) -> StoreResult<()> {
    if id.as_bytes().contains(&0) {
        return Err(StoreError::InvalidId { id: id.to_string() });
    }
    Ok(())
}
