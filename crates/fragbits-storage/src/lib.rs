//! Fragbits Storage Layer
//!
//! Persistent storage for fragment fingerprints and precomputed similarity
//! scores, using RocksDB as the underlying storage engine.
//!
//! # Architecture
//! - `store`: storage trait abstraction over the fingerprint store contract
//! - `fingerprint_store`: RocksDB fingerprint store implementation
//! - `bulk_load`: scoped durability switch for high-throughput loading
//! - `neighbor_index`: batch-built, read-only-at-serve pairs index
//! - `column_families`: column family definitions and tuning
//!
//! # Lifecycle
//! The build path is single-writer and offline: populate a
//! [`FingerprintStore`] (optionally inside a [`BulkLoadSession`]), then run
//! [`NeighborIndex::build`] once over the completed store. Serving opens the
//! index read-only and never recomputes scores.

pub mod bulk_load;
pub mod column_families;
pub mod error;
pub mod fingerprint_store;
pub mod neighbor_index;
pub mod store;

pub use bulk_load::BulkLoadSession;
pub use column_families::cf_names;
pub use error::{StoreError, StoreResult};
pub use fingerprint_store::{EntryIter, FingerprintStore, StoreConfig};
pub use neighbor_index::{BuildSummary, Neighbor, NeighborIndex};
pub use store::FingerprintStorage;

// Re-export core types storage consumers always need alongside the stores.
pub use fragbits_core::codec::CodecError;
pub use fragbits_core::{Fingerprint, FingerprintError};
