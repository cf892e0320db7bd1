//! Storage operation errors.
//!
//! One error enum covers both stores. Variants carry the offending
//! identifier or path so failures can be diagnosed without a debugger, and
//! nothing in this layer retries: every failure surfaces synchronously to
//! the caller.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database failed to open.
    #[error("Failed to open database at '{path}': {message}")]
    OpenFailed { path: String, message: String },

    /// Column family not found (should never happen if the DB opened correctly).
    #[error("Column family '{name}' not found")]
    ColumnFamilyNotFound { name: String },

    /// Read operation failed.
    #[error("Read failed: {0}")]
    ReadFailed(String),

    /// Write operation failed.
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Flush operation failed.
    #[error("Flush failed: {0}")]
    FlushFailed(String),

    /// No fingerprint stored under the identifier.
    ///
    /// Returned by `get()` and `delete()` on the fingerprint store and by
    /// `find()` on the neighbor index. Recoverable; the serving boundary
    /// maps it to an unknown-identifier response.
    #[error("Fingerprint not found: {id}")]
    NotFound {
        /// The identifier that was not found
        id: String,
    },

    /// Stored bytes for one record failed to decode.
    ///
    /// Fatal for that record only; other records in the store stay
    /// readable.
    #[error("Corrupt record '{id}': {message}")]
    Corrupt { id: String, message: String },

    /// An operation needed `number_of_bits` before it was set.
    #[error("number_of_bits is not set for this store")]
    BitCountUnset,

    /// The store contents cannot be scored as configured.
    #[error("Cannot score store contents: {0}")]
    Unscorable(#[from] fragbits_core::SimilarityError),

    /// Identifier contains a NUL byte, which is reserved as the
    /// composite-key separator in the neighbor index.
    #[error("Invalid identifier {id:?}: must not contain NUL")]
    InvalidId { id: String },

    /// A bulk-load session is already active on this store.
    #[error("A bulk-load session is already active on this store")]
    BulkLoadActive,

    /// The target directory already holds a built index.
    #[error("Refusing to build into '{path}': it already contains an index")]
    IndexExists { path: String },
}

/// Result type alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_carries_identifier() {
        let err = StoreError::NotFound {
            id: "2n2k_MTN_frag1".to_string(),
        };
        assert!(err.to_string().contains("2n2k_MTN_frag1"));
    }

    #[test]
    fn test_open_failed_display() {
        let err = StoreError::OpenFailed {
            path: "/tmp/db".to_string(),
            message: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/db"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_corrupt_carries_context() {
        let err = StoreError::Corrupt {
            id: "id1".to_string(),
            message: "truncated".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("id1"));
        assert!(msg.contains("truncated"));
    }
}
