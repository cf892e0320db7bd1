//! Fragbits Similarity Service
//!
//! The serving surface over a built neighbor index. A request-routing layer
//! (HTTP, RPC, CLI) holds a [`SimilarityService`] and threads it through
//! its handlers; there is no process-global state. Construction opens the
//! index, dropping (or [`SimilarityService::close`]) releases it.
//!
//! Results are plain serde-serializable records, so the routing layer can
//! emit JSON without further mapping. Unknown query identifiers surface as
//! [`ServiceError::UnknownIdentifier`], the 404-equivalent, never as a
//! generic fault.

mod service;

pub use service::{ServiceError, SimilarHit, SimilarityService};
