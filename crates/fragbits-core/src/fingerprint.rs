//! Sparse bit-vector fingerprints.
//!
//! A fingerprint records which structural features a molecular fragment
//! exhibits as the set of on-bit positions over a fixed universe of
//! `number_of_bits` positions. Fingerprints are typically far less than 10%
//! dense, so only the on-bit positions are stored.
//!
//! # Design Decisions
//!
//! - **u32 positions**: universes of hundreds of thousands of bits fit with
//!   room to spare, at four bytes per on-bit
//! - **Sorted positions**: required for the merge-join intersection count
//! - **Validation on construction**: fail fast with detailed error types
//!
//! The universe size is store-level metadata and deliberately not part of
//! this type; two fingerprints are only comparable when they were produced
//! against the same universe.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Sparse bit-vector over a fixed position universe.
///
/// Positions are kept strictly ascending without duplicates.
///
/// # Example
///
/// ```
/// use fragbits_core::Fingerprint;
///
/// let fp = Fingerprint::new(vec![1, 2, 4, 8]).unwrap();
/// assert_eq!(fp.count_ones(), 4);
/// assert!(fp.contains(4));
/// assert!(!fp.contains(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    positions: Vec<u32>,
}

impl Fingerprint {
    /// Create a fingerprint from already-sorted, duplicate-free positions.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::UnsortedOrDuplicate`] when the positions
    /// are not strictly ascending. The offending position is carried in the
    /// error.
    pub fn new(positions: Vec<u32>) -> Result<Self, FingerprintError> {
        let mut prev: Option<u32> = None;
        for &pos in &positions {
            if let Some(p) = prev {
                if pos <= p {
                    return Err(FingerprintError::UnsortedOrDuplicate { position: pos });
                }
            }
            prev = Some(pos);
        }
        Ok(Self { positions })
    }

    /// Create a fingerprint from positions in any order, dropping duplicates.
    pub fn from_positions<I: IntoIterator<Item = u32>>(positions: I) -> Self {
        let mut positions: Vec<u32> = positions.into_iter().collect();
        positions.sort_unstable();
        positions.dedup();
        Self { positions }
    }

    /// The empty fingerprint (no bits set).
    #[inline]
    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
        }
    }

    /// Number of on-bits (population count).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.positions.len()
    }

    /// True when no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the given position is set.
    ///
    /// Binary search, O(log n).
    pub fn contains(&self, position: u32) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    /// The on-bit positions, ascending.
    #[inline]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Count of positions set in both fingerprints.
    ///
    /// Two-pointer merge-join over the sorted position lists, O(n + m).
    pub fn intersection_count(&self, other: &Self) -> usize {
        let mut count = 0;
        let mut i = 0;
        let mut j = 0;

        while i < self.positions.len() && j < other.positions.len() {
            match self.positions[i].cmp(&other.positions[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        count
    }
}

impl Default for Fingerprint {
    fn default() -> Self {
        Self::empty()
    }
}

/// Errors for [`Fingerprint`] construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// Positions are not strictly ascending.
    ///
    /// The `position` field carries the value that violated the ordering
    /// constraint, either by repeating its predecessor or by sorting below
    /// it.
    #[error("positions must be sorted ascending without duplicates, failed at {position}")]
    UnsortedOrDuplicate {
        /// The position where the violation was detected
        position: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let fp = Fingerprint::new(vec![1, 2, 3]).unwrap();
        assert_eq!(fp.count_ones(), 3);
        assert_eq!(fp.positions(), &[1, 2, 3]);
    }

    #[test]
    fn test_new_empty() {
        let fp = Fingerprint::new(vec![]).unwrap();
        assert_eq!(fp.count_ones(), 0);
        assert!(fp.is_empty());
    }

    #[test]
    fn test_new_unsorted() {
        let result = Fingerprint::new(vec![100, 50]);
        assert!(matches!(
            result,
            Err(FingerprintError::UnsortedOrDuplicate { position: 50 })
        ));
    }

    #[test]
    fn test_new_duplicate() {
        let result = Fingerprint::new(vec![50, 50]);
        assert!(matches!(
            result,
            Err(FingerprintError::UnsortedOrDuplicate { position: 50 })
        ));
    }

    #[test]
    fn test_from_positions_sorts_and_dedups() {
        let fp = Fingerprint::from_positions([8, 1, 4, 2, 4]);
        assert_eq!(fp.positions(), &[1, 2, 4, 8]);
    }

    #[test]
    fn test_contains() {
        let fp = Fingerprint::new(vec![1, 3, 5, 8]).unwrap();
        assert!(fp.contains(1));
        assert!(fp.contains(8));
        assert!(!fp.contains(2));
        assert!(!fp.contains(9));
    }

    #[test]
    fn test_intersection_count() {
        let a = Fingerprint::new(vec![1, 2, 3]).unwrap();
        let b = Fingerprint::new(vec![1, 2, 4, 8]).unwrap();
        assert_eq!(a.intersection_count(&b), 2);
        assert_eq!(b.intersection_count(&a), 2);
    }

    #[test]
    fn test_intersection_count_disjoint() {
        let a = Fingerprint::new(vec![1, 3, 5]).unwrap();
        let b = Fingerprint::new(vec![2, 4, 6]).unwrap();
        assert_eq!(a.intersection_count(&b), 0);
    }

    #[test]
    fn test_intersection_count_empty() {
        let empty = Fingerprint::empty();
        let fp = Fingerprint::new(vec![1, 2, 3]).unwrap();
        assert_eq!(empty.intersection_count(&fp), 0);
        assert_eq!(fp.intersection_count(&empty), 0);
        assert_eq!(empty.intersection_count(&empty), 0);
    }

    #[test]
    fn test_error_display() {
        let e = FingerprintError::UnsortedOrDuplicate { position: 50 };
        assert_eq!(
            e.to_string(),
            "positions must be sorted ascending without duplicates, failed at 50"
        );
    }
}
