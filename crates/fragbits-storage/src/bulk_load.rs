//! Scoped durability switch for high-throughput loading.
//!
//! Populating a store one fingerprint at a time pays for a write-ahead log
//! record and a synchronous flush per write. A [`BulkLoadSession`] trades
//! that durability for throughput while it is alive: writes skip the WAL
//! and the sync. Whatever happens inside the session, ending it restores
//! the safe profile and flushes the buffered writes to SST files, so a
//! reader that runs after the session never observes the throughput mode.
//!
//! The guarantee rests on `Drop`: early returns, `?` propagation, and
//! panics all run the restoration path. Prefer [`BulkLoadSession::finish`]
//! where possible, since `Drop` can only log a failed flush while `finish`
//! reports it.
//!
//! # Example
//! ```rust,ignore
//! let session = BulkLoadSession::begin(&store)?;
//! for (id, fp) in fingerprints {
//!     store.put(&id, &fp)?;
//! }
//! session.finish()?;
//! ```

use tracing::{debug, error};

use crate::error::StoreResult;
use crate::fingerprint_store::FingerprintStore;

/// Guard holding a fingerprint store in the throughput durability profile.
///
/// At most one session per store at a time; a second
/// [`begin`](Self::begin) fails with `StoreError::BulkLoadActive` while one
/// is alive.
#[must_use = "the session restores durability when it ends; bind it to a variable"]
pub struct BulkLoadSession<'a> {
    store: &'a FingerprintStore,
    finished: bool,
}

impl<'a> BulkLoadSession<'a> {
    /// Switch the store to the throughput profile.
    ///
    /// # Errors
    /// - `StoreError::BulkLoadActive` when another session is active
    pub fn begin(store: &'a FingerprintStore) -> StoreResult<Self> {
        store.enter_bulk()?;
        debug!(path = store.path(), "bulk-load session started");
        Ok(Self {
            store,
            finished: false,
        })
    }

    /// Restore the safe profile and flush buffered writes.
    ///
    /// Consumes the session; flush failures are returned rather than
    /// logged.
    pub fn finish(mut self) -> StoreResult<()> {
        self.finished = true;
        let result = self.store.exit_bulk();
        debug!(path = self.store.path(), "bulk-load session finished");
        result
    }
}

impl Drop for BulkLoadSession<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.store.exit_bulk() {
            // Drop cannot return the failure; the profile is restored
            // either way.
            error!(
                path = self.store.path(),
                error = %e,
                "flush failed while ending bulk-load session"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use fragbits_core::Fingerprint;
    use tempfile::TempDir;

    fn create_temp_store() -> (TempDir, FingerprintStore) {
        let tmp = TempDir::new().expect("create temp dir");
        let store = FingerprintStore::open(tmp.path()).expect("open store");
        (tmp, store)
    }

    #[test]
    fn test_writes_inside_session_are_readable_after_finish() {
        let (_tmp, store) = create_temp_store();

        let session = BulkLoadSession::begin(&store).unwrap();
        for i in 0..100 {
            let fp = Fingerprint::from_positions([i, i + 1]);
            store.put(&format!("frag{i}"), &fp).unwrap();
        }
        session.finish().unwrap();

        assert_eq!(store.len().unwrap(), 100);
        assert_eq!(
            store.get("frag7").unwrap(),
            Fingerprint::from_positions([7, 8])
        );
    }

    #[test]
    fn test_second_session_fails_while_active() {
        let (_tmp, store) = create_temp_store();

        let session = BulkLoadSession::begin(&store).unwrap();
        let result = BulkLoadSession::begin(&store);
        assert!(matches!(result, Err(StoreError::BulkLoadActive)));

        session.finish().unwrap();
        // After finishing, a new session can start.
        let session = BulkLoadSession::begin(&store).unwrap();
        session.finish().unwrap();
    }

    #[test]
    fn test_drop_restores_profile() {
        let (_tmp, store) = create_temp_store();

        {
            let _session = BulkLoadSession::begin(&store).unwrap();
            store
                .put("id1", &Fingerprint::from_positions([1]))
                .unwrap();
        } // dropped without finish()

        // The profile is back to safe: a new session can begin, and the
        // buffered write was flushed.
        let session = BulkLoadSession::begin(&store).unwrap();
        session.finish().unwrap();
        assert!(store.contains("id1").unwrap());
    }

    #[test]
    fn test_error_unwind_restores_profile() {
        let (_tmp, store) = create_temp_store();

        fn load_and_fail(store: &FingerprintStore) -> StoreResult<()> {
            let _session = BulkLoadSession::begin(store)?;
            store.put("id1", &Fingerprint::from_positions([1]))?;
            store.delete("missing")?; // NotFound, propagates through ?
            unreachable!("delete of a missing id must fail");
        }

        assert!(matches!(
            load_and_fail(&store),
            Err(StoreError::NotFound { .. })
        ));

        // The early return ran the drop path.
        let session = BulkLoadSession::begin(&store).unwrap();
        session.finish().unwrap();
        assert!(store.contains("id1").unwrap());
    }

    #[test]
    fn test_panic_restores_profile() {
        let (_tmp, store) = create_temp_store();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _session = BulkLoadSession::begin(&store).unwrap();
            store
                .put("id1", &Fingerprint::from_positions([1]))
                .unwrap();
            panic!("loader crashed");
        }));
        assert!(result.is_err());

        // A following reader and writer observe the safe profile.
        assert!(store.contains("id1").unwrap());
        let session = BulkLoadSession::begin(&store).unwrap();
        session.finish().unwrap();
    }
}
