//! # Scorer Module
//!
//! Converts the Hamming distance between two fingerprints into a
//! similarity percentage.
//!
//! ## Bands (64-bit fingerprints)
//! | Distance | Similarity  | Classification   |
//! |----------|-------------|------------------|
//! | 0        | 100         | Exact match      |
//! | 1-4      | >= 93.75    | Near-exact       |
//! | 5-10     | >= 84.375   | Similar          |
//! | 11+      | lower       | Possibly similar |

use crate::core::hasher::Fingerprint;
use crate::error::CompareError;
use serde::{Deserialize, Serialize};

/// Similarity of two fingerprints in percent, rounded to two decimals.
///
/// Fails if the fingerprints have different bit counts.
pub fn score(a: &Fingerprint, b: &Fingerprint) -> Result<f64, CompareError> {
    let distance = a.distance(b)?;
    similarity_from_distance(distance, a.bit_count())
}

/// `round((1 - distance / bits) * 100, 2)`
///
/// A zero-bit fingerprint has no defined similarity and is rejected.
pub fn similarity_from_distance(distance: u32, bits: u32) -> Result<f64, CompareError> {
    if bits == 0 {
        return Err(CompareError::EmptyFingerprint);
    }
    let raw = (1.0 - distance as f64 / bits as f64) * 100.0;
    Ok((raw * 100.0).round() / 100.0)
}

/// Classification of match strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Identical fingerprints
    Exact,
    /// Virtually identical
    NearExact,
    /// Likely the same picture after edits or re-encoding
    Similar,
    /// Possibly related
    MaybeSimilar,
}

impl MatchType {
    /// Classify a similarity percentage
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 100.0 {
            MatchType::Exact
        } else if similarity >= 93.75 {
            MatchType::NearExact
        } else if similarity >= 84.375 {
            MatchType::Similar
        } else {
            MatchType::MaybeSimilar
        }
    }

    /// Check if this match type is considered a near-duplicate
    pub fn is_duplicate(&self) -> bool {
        matches!(self, MatchType::Exact | MatchType::NearExact | MatchType::Similar)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "Exact Match"),
            MatchType::NearExact => write!(f, "Near-Exact Match"),
            MatchType::Similar => write!(f, "Similar"),
            MatchType::MaybeSimilar => write!(f, "Possibly Similar"),
        }
    }
}
