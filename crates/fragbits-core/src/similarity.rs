//! Bias-corrected fingerprint similarity scoring.
//!
//! Raw overlap coefficients mislead when fingerprint collections differ in
//! average on-bit density: sparse collections agree on off-bits almost
//! everywhere by chance alone. The modified Tanimoto similarity of Fligner,
//! Verducci and Blower compensates by blending an on-bit and an off-bit
//! agreement term, weighted by a pair of corrections derived from the mean
//! on-bit density of a reference collection.
//!
//! The closed form used by [`score`] reproduces the reference
//! implementation's published result vectors exactly; see the tests at the
//! bottom of this module for the literal values.
//!
//! # Pipeline
//!
//! 1. [`mean_onbit_density`] over the whole collection
//! 2. [`corrections`] from that density
//! 3. [`score`] per pair, or [`batch_scores`] / [`score_pairs`] over the
//!    cross product with a cutoff

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fingerprint::Fingerprint;

/// Density-derived weights for the two agreement terms of [`score`].
///
/// Invariants: `corr_on + corr_off == 1`, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corrections {
    /// Weight of the on-bit agreement term, `(2 - p) / 3`.
    pub corr_on: f64,
    /// Weight of the off-bit agreement term, `(1 + p) / 3`.
    pub corr_off: f64,
}

/// One scored pair of fingerprint identifiers.
///
/// The score is symmetric in the two fingerprints; `left`/`right` only
/// record which enumeration direction produced the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    pub left: String,
    pub right: String,
    pub score: f64,
}

/// Errors for similarity computations.
///
/// These are usage errors, not runtime faults; callers should fix the
/// invocation rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    /// Mean density was requested over an empty collection.
    #[error("cannot compute mean on-bit density of an empty collection")]
    EmptyCollection,

    /// The declared universe size is unusable.
    #[error("number_of_bits must be positive, got {number_of_bits}")]
    InvalidBitCount {
        /// The rejected universe size
        number_of_bits: u32,
    },
}

/// Arithmetic mean of `count_ones / number_of_bits` over a collection.
///
/// # Errors
///
/// - [`SimilarityError::EmptyCollection`] for an empty collection
/// - [`SimilarityError::InvalidBitCount`] when `number_of_bits == 0`
///
/// # Example
///
/// ```
/// use fragbits_core::Fingerprint;
/// use fragbits_core::similarity::mean_onbit_density;
///
/// let fps = [
///     Fingerprint::from_positions([1, 2, 3]),
///     Fingerprint::from_positions([1, 2, 4, 5, 8]),
///     Fingerprint::from_positions([1, 2, 4, 8]),
/// ];
/// let p = mean_onbit_density(&fps, 100).unwrap();
/// assert_eq!(p, 0.04);
/// ```
pub fn mean_onbit_density<'a, I>(
    fingerprints: I,
    number_of_bits: u32,
) -> Result<f64, SimilarityError>
where
    I: IntoIterator<Item = &'a Fingerprint>,
{
    if number_of_bits == 0 {
        return Err(SimilarityError::InvalidBitCount { number_of_bits });
    }

    let mut total_onbits: u64 = 0;
    let mut count: u64 = 0;
    for fp in fingerprints {
        total_onbits += fp.count_ones() as u64;
        count += 1;
    }
    if count == 0 {
        return Err(SimilarityError::EmptyCollection);
    }

    let mean_onbits = total_onbits as f64 / count as f64;
    Ok(mean_onbits / f64::from(number_of_bits))
}

/// Correction pair for a mean on-bit density `p` in `[0, 1]`.
pub fn corrections(mean_onbit_density: f64) -> Corrections {
    let p = mean_onbit_density;
    Corrections {
        corr_on: (2.0 - p) / 3.0,
        corr_off: (1.0 + p) / 3.0,
    }
}

/// Bias-corrected similarity of two fingerprints from the same universe.
///
/// With `a` and `b` the two population counts, `c` the count of positions
/// set in both, and `n` the universe size:
///
/// ```text
/// st    = c / (a + b - c)            on-bit agreement
/// st0   = (n - a - b - c) / (n - c)  off-bit agreement
/// score = corr_on * st + corr_off * st0
/// ```
///
/// The result is in `[0, 1]` for the sparse fingerprints this system
/// handles, and higher means more similar. The function is symmetric in its
/// two fingerprint arguments and deterministic.
///
/// Degenerate inputs that would divide by zero are defined as zero
/// contribution: two empty fingerprints have `st = 0` (their score is then
/// exactly `corr_off`), and `c == n` zeroes the off-bit term.
pub fn score(
    fp_a: &Fingerprint,
    fp_b: &Fingerprint,
    number_of_bits: u32,
    corrections: Corrections,
) -> f64 {
    let a = fp_a.count_ones() as f64;
    let b = fp_b.count_ones() as f64;
    let c = fp_a.intersection_count(fp_b) as f64;
    let n = f64::from(number_of_bits);

    let union = a + b - c;
    let st = if union == 0.0 { 0.0 } else { c / union };

    let off_denominator = n - c;
    let st0 = if off_denominator == 0.0 {
        0.0
    } else {
        (n - a - b - c) / off_denominator
    };

    corrections.corr_on * st + corrections.corr_off * st0
}

/// Lazily score the cross product of two labeled collections.
///
/// Self-pairs (same identifier on both sides) are skipped. Pairs scoring
/// below `cutoff` are dropped. With `dedupe_symmetric` set, intended for
/// scoring a collection against itself, each unordered pair is emitted once,
/// in the direction whose left identifier sorts first; otherwise both
/// directions are emitted with equal scores.
///
/// Enumeration order is an implementation detail; callers needing a
/// deterministic order must sort the results.
pub fn score_pairs<'a>(
    left: &'a [(String, Fingerprint)],
    right: &'a [(String, Fingerprint)],
    number_of_bits: u32,
    corrections: Corrections,
    cutoff: f64,
    dedupe_symmetric: bool,
) -> impl Iterator<Item = ScoredPair> + 'a {
    left.iter().flat_map(move |(id_a, fp_a)| {
        right.iter().filter_map(move |(id_b, fp_b)| {
            score_one_pair(
                id_a,
                fp_a,
                id_b,
                fp_b,
                number_of_bits,
                corrections,
                cutoff,
                dedupe_symmetric,
            )
        })
    })
}

/// [`score_pairs`], partitioned across worker threads.
///
/// Each worker owns a disjoint slice of the pair space and filters against
/// the cutoff locally; the only shared state is the read-only fingerprint
/// data. Result order is unspecified.
pub fn batch_scores(
    left: &[(String, Fingerprint)],
    right: &[(String, Fingerprint)],
    number_of_bits: u32,
    corrections: Corrections,
    cutoff: f64,
    dedupe_symmetric: bool,
) -> Vec<ScoredPair> {
    left.par_iter()
        .flat_map_iter(|(id_a, fp_a)| {
            right.iter().filter_map(move |(id_b, fp_b)| {
                score_one_pair(
                    id_a,
                    fp_a,
                    id_b,
                    fp_b,
                    number_of_bits,
                    corrections,
                    cutoff,
                    dedupe_symmetric,
                )
            })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn score_one_pair(
    id_a: &str,
    fp_a: &Fingerprint,
    id_b: &str,
    fp_b: &Fingerprint,
    number_of_bits: u32,
    corrections: Corrections,
    cutoff: f64,
    dedupe_symmetric: bool,
) -> Option<ScoredPair> {
    if id_a == id_b {
        return None;
    }
    if dedupe_symmetric && id_a > id_b {
        return None;
    }

    let s = score(fp_a, fp_b, number_of_bits, corrections);
    if s < cutoff {
        return None;
    }

    Some(ScoredPair {
        left: id_a.to_string(),
        right: id_b.to_string(),
        score: s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUMBER_OF_BITS: u32 = 100;
    const CORR_ON: f64 = 0.6633333333333;
    const CORR_OFF: f64 = 0.3366666666667;

    fn test_corrections() -> Corrections {
        Corrections {
            corr_on: CORR_ON,
            corr_off: CORR_OFF,
        }
    }

    fn labeled_collection() -> Vec<(String, Fingerprint)> {
        vec![
            ("a".to_string(), Fingerprint::from_positions([1, 2, 3])),
            (
                "b".to_string(),
                Fingerprint::from_positions([1, 2, 4, 5, 8]),
            ),
            ("c".to_string(), Fingerprint::from_positions([1, 2, 4, 8])),
        ]
    }

    fn assert_scored_pairs(mut result: Vec<ScoredPair>, mut expected: Vec<(&str, &str, f64)>) {
        result.sort_by(|x, y| (&x.left, &x.right).cmp(&(&y.left, &y.right)));
        expected.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        assert_eq!(result.len(), expected.len(), "result: {result:?}");
        for (got, want) in result.iter().zip(&expected) {
            assert_eq!(got.left, want.0);
            assert_eq!(got.right, want.1);
            assert!(
                (got.score - want.2).abs() < 1e-9,
                "{} vs {}: expected {}, got {}",
                got.left,
                got.right,
                want.2,
                got.score
            );
        }
    }

    #[test]
    fn test_mean_onbit_density() {
        let fps: Vec<Fingerprint> = labeled_collection().into_iter().map(|(_, fp)| fp).collect();
        let p = mean_onbit_density(&fps, NUMBER_OF_BITS).unwrap();
        assert_eq!(p, 0.04);
    }

    #[test]
    fn test_mean_onbit_density_empty_collection() {
        let result = mean_onbit_density(&[], NUMBER_OF_BITS);
        assert!(matches!(result, Err(SimilarityError::EmptyCollection)));
    }

    #[test]
    fn test_mean_onbit_density_zero_bits() {
        let fps = [Fingerprint::from_positions([1])];
        let result = mean_onbit_density(&fps, 0);
        assert!(matches!(
            result,
            Err(SimilarityError::InvalidBitCount { number_of_bits: 0 })
        ));
    }

    #[test]
    fn test_corrections_at_one_percent_density() {
        let corr = corrections(0.01);
        assert!((corr.corr_on - 0.6633333333333).abs() < 1e-10);
        assert!((corr.corr_off - 0.3366666666667).abs() < 1e-10);
    }

    #[test]
    fn test_corrections_sum_to_one() {
        for p in [0.0, 0.01, 0.04, 0.5, 1.0] {
            let corr = corrections(p);
            assert!((corr.corr_on + corr.corr_off - 1.0).abs() < 1e-12, "p = {p}");
            assert!((0.0..=1.0).contains(&corr.corr_on));
            assert!((0.0..=1.0).contains(&corr.corr_off));
        }
    }

    #[test]
    fn test_score_reference_vector() {
        let fp_a = Fingerprint::from_positions([1, 2, 3]);
        let fp_b = Fingerprint::from_positions([1, 2, 4, 8]);

        let result = score(&fp_a, &fp_b, NUMBER_OF_BITS, test_corrections());

        assert!((result - 0.5779523809525572).abs() < 1e-9, "got {result}");
    }

    #[test]
    fn test_score_symmetric() {
        let fp_a = Fingerprint::from_positions([1, 2, 3]);
        let fp_b = Fingerprint::from_positions([1, 2, 4, 8]);
        let corr = test_corrections();
        assert_eq!(
            score(&fp_a, &fp_b, NUMBER_OF_BITS, corr),
            score(&fp_b, &fp_a, NUMBER_OF_BITS, corr)
        );
    }

    #[test]
    fn test_score_identical_sparse_fingerprints() {
        let fp = Fingerprint::from_positions([1, 2, 3]);
        let corr = test_corrections();
        // st = 1 and st0 just under 1, so the score sits close below 1.
        let s = score(&fp, &fp, NUMBER_OF_BITS, corr);
        assert!(s > 0.95 && s <= 1.0, "got {s}");
    }

    #[test]
    fn test_score_both_empty() {
        let empty = Fingerprint::empty();
        let corr = test_corrections();
        let s = score(&empty, &empty, NUMBER_OF_BITS, corr);
        assert!((s - corr.corr_off).abs() < 1e-12);
    }

    #[test]
    fn test_score_full_universe_does_not_divide_by_zero() {
        let full = Fingerprint::from_positions(0..4);
        let s = score(&full, &full, 4, test_corrections());
        assert!((s - CORR_ON).abs() < 1e-12);
    }

    #[test]
    fn test_batch_scores_dedupe_symmetric() {
        let fps = labeled_collection();

        let result = batch_scores(&fps, &fps, NUMBER_OF_BITS, test_corrections(), 0.55, true);

        // Pair a-b sits near 0.53, below the cutoff.
        assert_scored_pairs(
            result,
            vec![
                ("a", "c", 0.5779523809525572),
                ("b", "c", 0.8357708333333689),
            ],
        );
    }

    #[test]
    fn test_batch_scores_both_directions() {
        let fps = labeled_collection();

        let result = batch_scores(&fps, &fps, NUMBER_OF_BITS, test_corrections(), 0.55, false);

        assert_scored_pairs(
            result,
            vec![
                ("a", "c", 0.5779523809525572),
                ("c", "a", 0.5779523809525572),
                ("b", "c", 0.8357708333333689),
                ("c", "b", 0.8357708333333689),
            ],
        );
    }

    #[test]
    fn test_score_pairs_lazy_matches_batch() {
        let fps = labeled_collection();
        let corr = test_corrections();

        let lazy: Vec<ScoredPair> =
            score_pairs(&fps, &fps, NUMBER_OF_BITS, corr, 0.55, true).collect();
        let mut batch = batch_scores(&fps, &fps, NUMBER_OF_BITS, corr, 0.55, true);

        let mut lazy = lazy;
        lazy.sort_by(|x, y| (&x.left, &x.right).cmp(&(&y.left, &y.right)));
        batch.sort_by(|x, y| (&x.left, &x.right).cmp(&(&y.left, &y.right)));
        assert_eq!(lazy, batch);
    }

    #[test]
    fn test_score_pairs_excludes_self_pairs() {
        let fps = labeled_collection();
        let corr = test_corrections();

        let result: Vec<ScoredPair> =
            score_pairs(&fps, &fps, NUMBER_OF_BITS, corr, 0.0, false).collect();

        assert!(result.iter().all(|p| p.left != p.right));
        // Three fragments, both directions, no self-pairs.
        assert_eq!(result.len(), 6);
    }

    #[test]
    fn test_score_pairs_cutoff_is_inclusive() {
        let fps = labeled_collection();
        let corr = test_corrections();

        // A cutoff exactly equal to a pair's score keeps that pair.
        let ac_score = score(&fps[0].1, &fps[2].1, NUMBER_OF_BITS, corr);
        let result: Vec<ScoredPair> =
            score_pairs(&fps, &fps, NUMBER_OF_BITS, corr, ac_score, true).collect();

        assert!(result.iter().any(|p| p.left == "a" && p.right == "c"));
    }
}
