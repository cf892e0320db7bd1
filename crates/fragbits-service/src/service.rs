//! Similarity query service.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use fragbits_storage::{NeighborIndex, StoreError};

/// One similarity hit, shaped for the request-routing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarHit {
    /// The query fragment identifier.
    pub query_frag_id: String,
    /// The similar fragment found.
    pub hit_frag_id: String,
    /// Bias-corrected similarity score in [0, 1].
    pub score: f64,
}

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The query identifier is not known to the index.
    ///
    /// Client-visible; the routing layer maps it to its not-found
    /// response.
    #[error("Fragment with identifier '{id}' not found")]
    UnknownIdentifier {
        /// The unknown fragment identifier
        id: String,
    },

    /// A bulk query resolved only some of its identifiers.
    ///
    /// Carries the hits that were found alongside the identifiers that
    /// were not, so callers can report partial results.
    #[error("{} identifier(s) could not be resolved", absent_identifiers.len())]
    Incomplete {
        /// Hits for the identifiers that did resolve
        hits: Vec<SimilarHit>,
        /// Query identifiers unknown to the index
        absent_identifiers: Vec<String>,
    },

    /// The index storage failed.
    #[error("Index storage failure: {0}")]
    Storage(StoreError),
}

/// Query handle over an open neighbor index.
///
/// Construct once at startup, pass by reference into request handlers, and
/// drop (or [`close`](Self::close)) at shutdown.
pub struct SimilarityService {
    index: NeighborIndex,
}

impl SimilarityService {
    /// Open the index at `path` read-only and wrap it for serving.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ServiceError> {
        let index = NeighborIndex::open(path).map_err(ServiceError::Storage)?;
        info!(path = index.path(), "similarity service ready");
        Ok(Self { index })
    }

    /// Wrap an already-open index.
    pub fn from_index(index: NeighborIndex) -> Self {
        Self { index }
    }

    /// Fragments similar to `fragment_id`, best first.
    ///
    /// Hits scoring below `cutoff` are discarded; `limit` caps the result
    /// count (`None` keeps all).
    ///
    /// # Errors
    /// - [`ServiceError::UnknownIdentifier`] when the identifier was not
    ///   in the store the index was built from
    pub fn similar_fragments(
        &self,
        fragment_id: &str,
        cutoff: f64,
        limit: Option<usize>,
    ) -> Result<Vec<SimilarHit>, ServiceError> {
        let neighbors = self
            .index
            .find(fragment_id, cutoff, limit)
            .map_err(|e| match e {
                StoreError::NotFound { id } => ServiceError::UnknownIdentifier { id },
                other => ServiceError::Storage(other),
            })?;

        debug!(fragment_id, cutoff, hits = neighbors.len(), "similarity query");
        Ok(neighbors
            .into_iter()
            .map(|neighbor| SimilarHit {
                query_frag_id: fragment_id.to_string(),
                hit_frag_id: neighbor.id,
                score: neighbor.score,
            })
            .collect())
    }

    /// [`similar_fragments`](Self::similar_fragments) over many query
    /// identifiers, concatenated in query order.
    ///
    /// # Errors
    /// - [`ServiceError::Incomplete`] when any identifier is unknown; the
    ///   error carries the hits for the identifiers that resolved plus the
    ///   absent identifier list
    pub fn similar_fragments_bulk(
        &self,
        fragment_ids: &[String],
        cutoff: f64,
        limit: Option<usize>,
    ) -> Result<Vec<SimilarHit>, ServiceError> {
        let mut hits = Vec::new();
        let mut absent_identifiers = Vec::new();

        for fragment_id in fragment_ids {
            match self.similar_fragments(fragment_id, cutoff, limit) {
                Ok(found) => hits.extend(found),
                Err(ServiceError::UnknownIdentifier { id }) => absent_identifiers.push(id),
                Err(other) => return Err(other),
            }
        }

        if absent_identifiers.is_empty() {
            Ok(hits)
        } else {
            Err(ServiceError::Incomplete {
                hits,
                absent_identifiers,
            })
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &NeighborIndex {
        &self.index
    }

    /// Release the index storage handles.
    ///
    /// Dropping the service has the same effect; `close` exists for
    /// call sites that want the release to be visible in the code.
    pub fn close(self) {
        info!(path = self.index.path(), "similarity service closed");
    }
}
