//! # Core Module
//!
//! The front-end-agnostic matching engine.
//!
//! ## Modules
//! - `hasher` - Turns image bytes into perceptual fingerprints
//! - `codec` - Canonical hex text form of fingerprints
//! - `scorer` - Similarity percentage from Hamming distance
//! - `ranking` - Threshold, stable sort and top-k over all references
//! - `store` - Blob and record stores
//! - `service` - Register and compare request handlers

pub mod codec;
pub mod hasher;
pub mod ranking;
pub mod scorer;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use codec::FingerprintCodec;
pub use hasher::{Fingerprint, FingerprintExtractor, HasherConfig};
pub use ranking::{rank, MatchResult, RankOutcome, RankParams, SkippedCandidate};
pub use scorer::{score, MatchType};
pub use service::{CompareRequest, ImageUpload, RegisterRequest, SimilarityService};
pub use store::{BlobStore, RecordStore, ReferenceRecord};
