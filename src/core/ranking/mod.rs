//! # Ranking Module
//!
//! Scores a query fingerprint against every stored reference and returns
//! the best matches.
//!
//! ## How It Works
//! 1. Decode each reference's stored fingerprint text (in parallel)
//! 2. Score it against the query
//! 3. Keep scores `>= threshold`
//! 4. Stable sort by score, highest first
//! 5. Keep the first `top_k`
//!
//! A reference whose stored text does not decode is skipped and reported
//! in [`RankOutcome::skipped`]; it never aborts the run. A size mismatch
//! between a decoded reference and the query means the table and the
//! hasher configuration disagree, and fails the whole comparison.

use crate::core::codec::FingerprintCodec;
use crate::core::hasher::Fingerprint;
use crate::core::scorer::{self, MatchType};
use crate::core::store::ReferenceRecord;
use crate::error::{CodecError, CompareError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Threshold and result count for one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankParams {
    threshold: f64,
    top_k: usize,
}

impl RankParams {
    /// Validate and create parameters.
    ///
    /// Any threshold except NaN is accepted; one above 100 simply
    /// excludes everything.
    pub fn new(threshold: f64, top_k: usize) -> Result<Self, CompareError> {
        if threshold.is_nan() {
            return Err(CompareError::InvalidThreshold { value: threshold });
        }
        if top_k == 0 {
            return Err(CompareError::InvalidTopK { value: top_k });
        }
        Ok(Self { threshold, top_k })
    }

    /// Minimum similarity kept (inclusive)
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Maximum number of matches returned
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// A reference that scored at or above the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: i64,
    pub file_name: String,
    pub locator: String,
    /// Similarity in percent, two decimals
    pub similarity: f64,
    /// Hamming distance in bits
    pub distance: u32,
    pub match_type: MatchType,
    pub annotation: Option<String>,
}

/// A reference left out because its stored fingerprint is corrupt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub id: i64,
    pub file_name: String,
    pub reason: String,
}

/// Everything a comparison produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankOutcome {
    /// Best matches, highest similarity first
    pub matches: Vec<MatchResult>,
    /// References whose fingerprint text could not be decoded
    pub skipped: Vec<SkippedCandidate>,
    /// Number of references looked at
    pub considered: usize,
    /// Number of references at or above the threshold, before truncation
    pub above_threshold: usize,
}

enum Scored {
    Match(MatchResult),
    Below,
    Corrupt(SkippedCandidate, CodecError),
}

fn score_candidate(
    query: &Fingerprint,
    candidate: &ReferenceRecord,
    codec: &FingerprintCodec,
    threshold: f64,
) -> Result<Scored, CompareError> {
    let stored = match codec.decode(&candidate.fingerprint) {
        Ok(fingerprint) => fingerprint,
        Err(e) => {
            let skipped = SkippedCandidate {
                id: candidate.id,
                file_name: candidate.file_name.clone(),
                reason: e.to_string(),
            };
            return Ok(Scored::Corrupt(skipped, e));
        }
    };

    let distance = query.distance(&stored)?;
    let similarity = scorer::similarity_from_distance(distance, query.bit_count())?;

    if similarity < threshold {
        return Ok(Scored::Below);
    }

    Ok(Scored::Match(MatchResult {
        id: candidate.id,
        file_name: candidate.file_name.clone(),
        locator: candidate.locator.clone(),
        similarity,
        distance,
        match_type: MatchType::from_similarity(similarity),
        annotation: candidate.annotation.clone(),
    }))
}

/// Rank `candidates` against `query`.
///
/// Ties keep their input order, whatever order the parallel workers
/// finish in.
pub fn rank(
    query: &Fingerprint,
    candidates: &[ReferenceRecord],
    codec: &FingerprintCodec,
    params: &RankParams,
) -> Result<RankOutcome, CompareError> {
    // Indexed collect keeps input order
    let scored: Vec<Result<Scored, CompareError>> = candidates
        .par_iter()
        .map(|candidate| score_candidate(query, candidate, codec, params.threshold))
        .collect();

    let mut matches = Vec::new();
    let mut skipped = Vec::new();

    for result in scored {
        match result? {
            Scored::Match(m) => matches.push(m),
            Scored::Below => {}
            Scored::Corrupt(candidate, error) => {
                tracing::warn!(
                    id = candidate.id,
                    file_name = %candidate.file_name,
                    %error,
                    "Skipping reference with unreadable fingerprint"
                );
                skipped.push(candidate);
            }
        }
    }

    let above_threshold = matches.len();

    // sort_by is stable
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches.truncate(params.top_k);

    tracing::debug!(
        considered = candidates.len(),
        above_threshold,
        returned = matches.len(),
        skipped = skipped.len(),
        "Ranked references"
    );

    Ok(RankOutcome {
        matches,
        skipped,
        considered: candidates.len(),
        above_threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fp(value: u64) -> Fingerprint {
        Fingerprint::from_bytes(value.to_be_bytes().to_vec())
    }

    fn record(id: i64, fingerprint: &str) -> ReferenceRecord {
        ReferenceRecord {
            id,
            file_name: format!("{}.png", id),
            locator: format!("source-images/{}.png", id),
            fingerprint: fingerprint.to_string(),
            annotation: None,
            created_at: Some(Utc::now()),
        }
    }

    fn record_for(id: i64, value: u64) -> ReferenceRecord {
        record(id, &FingerprintCodec::default().encode(&fp(value)))
    }

    fn params(threshold: f64, top_k: usize) -> RankParams {
        RankParams::new(threshold, top_k).unwrap()
    }

    fn ids(outcome: &RankOutcome) -> Vec<i64> {
        outcome.matches.iter().map(|m| m.id).collect()
    }

    #[test]
    fn empty_candidates_give_empty_result() {
        let outcome = rank(&fp(0), &[], &FingerprintCodec::default(), &params(40.0, 5)).unwrap();

        assert!(outcome.matches.is_empty());
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.considered, 0);
    }

    #[test]
    fn threshold_above_100_excludes_everything() {
        let candidates = vec![record_for(1, 0), record_for(2, 1), record_for(3, 3)];

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(101.0, 5)).unwrap();

        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.considered, 3);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 32 of 64 bits differ: exactly 50.0
        let candidates = vec![record_for(1, 0xFFFF_FFFF)];

        let kept = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(50.0, 5)).unwrap();
        let dropped = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(50.01, 5)).unwrap();

        assert_eq!(ids(&kept), vec![1]);
        assert!(dropped.matches.is_empty());
    }

    #[test]
    fn never_returns_scores_below_threshold() {
        let candidates: Vec<_> = (0..64u32)
            .map(|bits| record_for(bits as i64, (1u64 << bits) - 1))
            .collect();

        for threshold in [0.0, 25.0, 60.0, 90.0, 100.0] {
            let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(threshold, 64)).unwrap();
            assert!(outcome.matches.iter().all(|m| m.similarity >= threshold));
        }
    }

    #[test]
    fn results_are_sorted_highest_first() {
        let candidates = vec![record_for(1, 0xFF), record_for(2, 0), record_for(3, 0x0F)];

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(0.0, 5)).unwrap();

        assert_eq!(ids(&outcome), vec![2, 3, 1]);
        assert_eq!(outcome.matches[0].similarity, 100.0);
        assert_eq!(outcome.matches[0].match_type, MatchType::Exact);
    }

    #[test]
    fn ties_keep_input_order() {
        // 0x01, 0x02 and 0x80 are all one bit away from 0
        let candidates = vec![
            record_for(7, 0x02),
            record_for(3, 0x80),
            record_for(9, 0),
            record_for(5, 0x01),
        ];

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(0.0, 10)).unwrap();

        assert_eq!(ids(&outcome), vec![9, 7, 3, 5]);
    }

    #[test]
    fn ties_keep_input_order_for_large_inputs() {
        let candidates: Vec<_> = (0..2000i64)
            .map(|id| record_for(id, if id % 2 == 0 { 0x01 } else { 0x03 }))
            .collect();

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(0.0, 2000)).unwrap();

        let expected: Vec<i64> = (0..2000)
            .filter(|id| id % 2 == 0)
            .chain((0..2000).filter(|id| id % 2 == 1))
            .collect();
        assert_eq!(ids(&outcome), expected);
    }

    #[test]
    fn top_k_truncates() {
        let candidates: Vec<_> = (0..10).map(|id| record_for(id, id as u64)).collect();

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(0.0, 3)).unwrap();

        assert_eq!(outcome.matches.len(), 3);
        assert_eq!(outcome.above_threshold, 10);
    }

    #[test]
    fn top_k_larger_than_survivors_returns_all() {
        let candidates = vec![record_for(1, 0), record_for(2, u64::MAX)];

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(90.0, 5)).unwrap();

        assert_eq!(ids(&outcome), vec![1]);
    }

    #[test]
    fn corrupt_row_is_skipped_and_reported() {
        let candidates = vec![
            record_for(1, 0),
            record(2, "not-a-fingerprint"),
            record(3, "abc"),
            record_for(4, 0x01),
        ];

        let outcome = rank(&fp(0), &candidates, &FingerprintCodec::default(), &params(40.0, 5)).unwrap();

        assert_eq!(ids(&outcome), vec![1, 4]);
        let skipped: Vec<_> = outcome.skipped.iter().map(|s| s.id).collect();
        assert_eq!(skipped, vec![2, 3]);
        assert!(outcome.skipped[1].reason.contains("expected 16"));
    }

    #[test]
    fn dimension_mismatch_is_fatal() {
        // The codec decodes 128-bit text but the query has 64 bits
        let codec = FingerprintCodec::new(128);
        let candidates = vec![record(1, &"0".repeat(32))];

        let result = rank(&fp(0), &candidates, &codec, &params(0.0, 5));

        assert_eq!(
            result,
            Err(CompareError::DimensionMismatch { left: 64, right: 128 })
        );
    }

    #[test]
    fn zero_bit_codec_is_rejected_not_scored() {
        let codec = FingerprintCodec::new(0);
        let query = Fingerprint::from_bytes(Vec::new());
        let candidates = vec![record(1, "")];

        let result = rank(&query, &candidates, &codec, &params(0.0, 5));

        assert_eq!(result, Err(CompareError::EmptyFingerprint));
    }

    #[test]
    fn params_reject_zero_top_k_and_nan() {
        assert_eq!(
            RankParams::new(40.0, 0),
            Err(CompareError::InvalidTopK { value: 0 })
        );
        assert!(RankParams::new(f64::NAN, 5).is_err());
        assert!(RankParams::new(101.0, 1).is_ok());
    }

    #[test]
    fn match_carries_record_metadata() {
        let mut candidate = record_for(11, 0);
        candidate.annotation = Some("poster".to_string());

        let outcome = rank(&fp(0), &[candidate], &FingerprintCodec::default(), &params(0.0, 1)).unwrap();
        let m = &outcome.matches[0];

        assert_eq!(m.file_name, "11.png");
        assert_eq!(m.locator, "source-images/11.png");
        assert_eq!(m.annotation.as_deref(), Some("poster"));
        assert_eq!(m.distance, 0);
    }
}
