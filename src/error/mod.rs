//! # Error Module
//!
//! Error types for the image similarity checker.
//!
//! ## Design Principles
//! - **Never substitute defaults** - a bad image or a corrupt stored hash is
//!   an error, never a zero fingerprint or a zero score
//! - **Include context** - file names, blob keys, record ids
//! - **One enum per concern** - wrapped by [`SimilarityError`]

use crate::core::service::RegisterReport;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SimilarityError {
    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Fingerprint format error: {0}")]
    Codec(#[from] CodecError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A store failure stopped a registration batch; `partial` holds
    /// everything decided before it
    #[error(
        "Registration stopped after {} image(s) were registered: {source}",
        .partial.registered.len()
    )]
    RegistrationAborted {
        partial: Box<RegisterReport>,
        #[source]
        source: StoreError,
    },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while turning image bytes into a fingerprint
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Image data is empty")]
    EmptyInput,

    #[error("Unsupported or unrecognised image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {reason}")]
    Decode { reason: String },

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("Invalid hash size {size} (must be 8, 16 or 32)")]
    InvalidHashSize { size: u32 },
}

/// Errors decoding the canonical text form of a fingerprint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Fingerprint text has {actual} characters, expected {expected}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Fingerprint text has non-hex character {character:?} at position {position}")]
    InvalidCharacter { position: usize, character: char },
}

/// Errors that occur while scoring or ranking
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    #[error("Fingerprint size mismatch: {left} bits vs {right} bits. The reference table may hold hashes from a different configuration.")]
    DimensionMismatch { left: u32, right: u32 },

    #[error("Fingerprint has no bits")]
    EmptyFingerprint,

    #[error("Invalid threshold: {value}")]
    InvalidThreshold { value: f64 },

    #[error("Invalid top-k: {value} (must be at least 1)")]
    InvalidTopK { value: usize },
}

/// Errors from the blob store and the record store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write or read blob {key}: {source}")]
    Blob {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Blob not found: {key}")]
    BlobNotFound { key: String },

    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },

    #[error("Reference record not found: {id}")]
    RecordNotFound { id: i64 },

    #[error("Failed to open reference database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Store lock poisoned at {path}. Restart the application.")]
    Corrupted { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SimilarityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_reports_position() {
        let error = CodecError::InvalidCharacter {
            position: 3,
            character: 'z',
        };
        let message = error.to_string();
        assert!(message.contains("'z'"));
        assert!(message.contains("position 3"));
    }

    #[test]
    fn store_error_includes_key() {
        let error = StoreError::BlobNotFound {
            key: "source-images/20240101.png".to_string(),
        };
        assert!(error.to_string().contains("source-images/20240101.png"));
    }

    #[test]
    fn dimension_mismatch_mentions_both_sizes() {
        let error = CompareError::DimensionMismatch { left: 64, right: 256 };
        let message = error.to_string();
        assert!(message.contains("64"));
        assert!(message.contains("256"));
    }

    #[test]
    fn aborted_registration_reports_progress_and_cause() {
        let error = SimilarityError::RegistrationAborted {
            partial: Box::new(RegisterReport {
                registered: Vec::new(),
                failed: Vec::new(),
                duration_ms: 0,
            }),
            source: StoreError::QueryFailed("disk I/O error".to_string()),
        };
        let message = error.to_string();
        assert!(message.contains("after 0 image(s)"));
        assert!(message.contains("disk I/O error"));
    }

    #[test]
    fn errors_convert_into_top_level() {
        let error: SimilarityError = HashError::EmptyInput.into();
        assert!(matches!(error, SimilarityError::Hash(HashError::EmptyInput)));
    }
}
