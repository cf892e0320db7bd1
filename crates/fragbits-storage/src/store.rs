//! Fingerprint storage trait abstraction.
//!
//! [`FingerprintStorage`] captures the store contract consumed by the
//! neighbor index builder and other read/write clients, so they depend on
//! the seam rather than on RocksDB directly.
//!
//! # Implementors
//! - [`crate::FingerprintStore`]: production RocksDB implementation
//!
//! # Object Safety
//! The trait is object-safe and usable as `dyn FingerprintStorage`. Lazy
//! iteration stays on the concrete type; trait clients that need the full
//! contents take the [`materialize`](FingerprintStorage::materialize)
//! snapshot.

use std::collections::BTreeMap;

use fragbits_core::Fingerprint;

use crate::error::StoreResult;

/// Storage contract for an identifier -> fingerprint mapping with one
/// optional universe-size scalar.
///
/// # Thread Safety
/// Implementors must be `Send + Sync`; the batch build fans reads out
/// across worker threads.
pub trait FingerprintStorage: Send + Sync {
    /// The declared universe size, or `None` until it has been set.
    fn number_of_bits(&self) -> StoreResult<Option<u32>>;

    /// Set the declared universe size.
    fn set_number_of_bits(&self, number_of_bits: u32) -> StoreResult<()>;

    /// Clear the declared universe size back to absent. Entries are
    /// untouched.
    fn clear_number_of_bits(&self) -> StoreResult<()>;

    /// Count of stored identifier -> fingerprint entries.
    fn len(&self) -> StoreResult<usize>;

    /// True when no entry is stored.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Membership test.
    fn contains(&self, id: &str) -> StoreResult<bool>;

    /// Fetch one fingerprint.
    ///
    /// # Errors
    /// - `StoreError::NotFound` carrying the identifier when absent
    /// - `StoreError::Corrupt` when the stored bytes fail to decode
    fn get(&self, id: &str) -> StoreResult<Fingerprint>;

    /// Create or overwrite one entry.
    fn put(&self, id: &str, fingerprint: &Fingerprint) -> StoreResult<()>;

    /// Remove one entry.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when the identifier is absent
    fn delete(&self, id: &str) -> StoreResult<()>;

    /// All identifiers in storage order (lexicographic, stable).
    fn keys(&self) -> StoreResult<Vec<String>>;

    /// Full in-memory snapshot, equal in content to iterating all entries.
    fn materialize(&self) -> StoreResult<BTreeMap<String, Fingerprint>>;
}
