//! Fragbits Core Library
//!
//! Domain types and pure computation for the fragbits fingerprint
//! similarity system.
//!
//! # Architecture
//!
//! This crate defines:
//! - The sparse [`Fingerprint`] bit-vector type
//! - The binary fingerprint codec ([`codec`])
//! - The bias-corrected similarity engine ([`similarity`])
//! - Configuration structures ([`config`])
//! - Error types and result aliases
//!
//! Persistence lives in `fragbits-storage`; this crate has no knowledge of
//! any storage backend.
//!
//! # Example
//!
//! ```
//! use fragbits_core::Fingerprint;
//! use fragbits_core::similarity::{corrections, score};
//!
//! let a = Fingerprint::from_positions([1, 2, 3]);
//! let b = Fingerprint::from_positions([1, 2, 4, 8]);
//! let corr = corrections(0.01);
//! let s = score(&a, &b, 100, corr);
//! assert!(s > 0.0 && s < 1.0);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod similarity;

// Re-exports for convenience
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use similarity::{Corrections, ScoredPair, SimilarityError};
