//! Binary fingerprint codec.
//!
//! Encodes a [`Fingerprint`] as its on-bit positions, four little-endian
//! bytes each, in ascending order. For the sparse fingerprints this system
//! stores (well under 10% density) that is far smaller than a dense bit
//! array of `number_of_bits / 8` bytes.
//!
//! The codec knows nothing about the universe size; it stores exactly the
//! positions present. Decoding validates the payload and never silently
//! truncates: a trailing partial word, an out-of-order position, or a
//! duplicate is a [`CodecError`].

use thiserror::Error;

use crate::fingerprint::{Fingerprint, FingerprintError};

/// Bytes per encoded position.
const POSITION_WIDTH: usize = std::mem::size_of::<u32>();

/// Errors for fingerprint decoding.
///
/// Encoding is infallible; these cover malformed stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Payload length is not a whole number of positions.
    #[error("encoded fingerprint truncated: {len} bytes is not a multiple of {POSITION_WIDTH}")]
    Truncated {
        /// Actual byte count received
        len: usize,
    },

    /// Decoded positions violate the fingerprint invariant.
    #[error("invalid encoded positions: {0}")]
    Positions(#[from] FingerprintError),
}

/// Encode a fingerprint to its compact binary form.
///
/// The empty fingerprint encodes to an empty byte vector.
pub fn encode(fingerprint: &Fingerprint) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(fingerprint.count_ones() * POSITION_WIDTH);
    for &position in fingerprint.positions() {
        bytes.extend_from_slice(&position.to_le_bytes());
    }
    bytes
}

/// Decode a fingerprint from its compact binary form.
///
/// Exact inverse of [`encode`]: `decode(&encode(fp)) == fp` for every
/// fingerprint, including the empty one.
///
/// # Errors
///
/// - [`CodecError::Truncated`] when the length is not a multiple of 4
/// - [`CodecError::Positions`] when positions are unsorted or duplicated
pub fn decode(bytes: &[u8]) -> Result<Fingerprint, CodecError> {
    if bytes.len() % POSITION_WIDTH != 0 {
        return Err(CodecError::Truncated { len: bytes.len() });
    }

    let mut positions = Vec::with_capacity(bytes.len() / POSITION_WIDTH);
    for chunk in bytes.chunks_exact(POSITION_WIDTH) {
        positions.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(Fingerprint::new(positions)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let fp = Fingerprint::new(vec![1, 3, 5, 8]).unwrap();
        let bytes = encode(&fp);
        assert_eq!(bytes.len(), 16);
        let restored = decode(&bytes).unwrap();
        assert_eq!(restored, fp);
    }

    #[test]
    fn test_round_trip_empty() {
        let fp = Fingerprint::empty();
        let bytes = encode(&fp);
        assert!(bytes.is_empty());
        let restored = decode(&bytes).unwrap();
        assert_eq!(restored, fp);
    }

    #[test]
    fn test_round_trip_large_positions() {
        let fp = Fingerprint::new(vec![0, 1, u32::MAX - 1, u32::MAX]).unwrap();
        let restored = decode(&encode(&fp)).unwrap();
        assert_eq!(restored, fp);
    }

    #[test]
    fn test_decode_truncated() {
        let fp = Fingerprint::new(vec![1, 2, 3]).unwrap();
        let mut bytes = encode(&fp);
        bytes.pop();
        let result = decode(&bytes);
        assert!(matches!(result, Err(CodecError::Truncated { len: 11 })));
    }

    #[test]
    fn test_decode_unsorted() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9_u32.to_le_bytes());
        bytes.extend_from_slice(&3_u32.to_le_bytes());
        let result = decode(&bytes);
        assert!(matches!(result, Err(CodecError::Positions(_))));
    }

    #[test]
    fn test_decode_duplicate() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7_u32.to_le_bytes());
        bytes.extend_from_slice(&7_u32.to_le_bytes());
        let result = decode(&bytes);
        assert!(matches!(
            result,
            Err(CodecError::Positions(
                FingerprintError::UnsortedOrDuplicate { position: 7 }
            ))
        ));
    }

    #[test]
    fn test_encoding_is_compact_for_sparse_input() {
        // 50 on-bits over a one-million-bit universe: 200 bytes encoded
        // versus 125_000 bytes for a dense bit array.
        let fp = Fingerprint::from_positions((0..50).map(|i| i * 20_000));
        assert_eq!(encode(&fp).len(), 200);
    }

    #[test]
    fn test_error_display() {
        let e = CodecError::Truncated { len: 7 };
        assert!(e.to_string().contains("7 bytes"));
    }
}
