//! The fingerprint value type.

use crate::error::CompareError;

/// A perceptual fingerprint: a fixed-length bit vector packed into bytes.
///
/// Fingerprints are only ever compared by Hamming distance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    bytes: Vec<u8>,
}

impl Fingerprint {
    /// Create a fingerprint from its packed bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the packed bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the total number of bits
    pub fn bit_count(&self) -> u32 {
        (self.bytes.len() * 8) as u32
    }

    /// Count the bits that differ from `other`.
    ///
    /// Fails when the two fingerprints have different lengths.
    pub fn distance(&self, other: &Self) -> Result<u32, CompareError> {
        if self.bytes.len() != other.bytes.len() {
            return Err(CompareError::DimensionMismatch {
                left: self.bit_count(),
                right: other.bit_count(),
            });
        }

        Ok(self
            .bytes
            .iter()
            .zip(other.bytes.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }
}
