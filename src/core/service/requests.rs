//! Request and report types for the service handlers.

use crate::core::ranking::RankOutcome;
use serde::{Deserialize, Serialize};

/// One uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Display name, usually the original file name
    pub name: String,
    /// Raw encoded image bytes
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Register a batch of reference images
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub images: Vec<ImageUpload>,
    /// Annotation applied to every image in the batch
    pub annotation: Option<String>,
}

impl RegisterRequest {
    pub fn new(images: Vec<ImageUpload>, annotation: Option<String>) -> Self {
        Self { images, annotation }
    }
}

/// Compare one query image against every reference
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub query: ImageUpload,
    /// Minimum similarity in percent (inclusive)
    pub threshold: f64,
    /// Maximum number of matches
    pub top_k: usize,
}

impl CompareRequest {
    pub fn new(query: ImageUpload, threshold: f64, top_k: usize) -> Self {
        Self {
            query,
            threshold,
            top_k,
        }
    }
}

/// A successfully registered image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredImage {
    pub id: i64,
    pub file_name: String,
    pub locator: String,
    pub fingerprint: String,
}

/// An image that could not be registered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub file_name: String,
    pub reason: String,
}

/// Result of a registration batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReport {
    pub registered: Vec<RegisteredImage>,
    pub failed: Vec<RegistrationFailure>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Result of a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub query_name: String,
    /// Query fingerprint in canonical hex form
    pub query_fingerprint: String,
    pub threshold: f64,
    pub top_k: usize,
    /// References in the store at comparison time
    pub total_references: usize,
    pub outcome: RankOutcome,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
