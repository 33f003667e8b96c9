//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};

/// All events emitted by the register and compare flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Registration events
    Register(RegisterEvent),
    /// Comparison events
    Compare(CompareEvent),
}

/// Events while registering a batch of reference images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegisterEvent {
    /// Registration has started
    Started { total_images: usize },
    /// Progress update after each image
    Progress(RegisterProgress),
    /// An image was stored and recorded
    Registered { id: i64, file_name: String },
    /// An image could not be fingerprinted; the batch continues
    Failed { file_name: String, message: String },
    /// Registration completed
    Completed { registered: usize, failed: usize },
    /// A store failure stopped the batch
    Aborted { registered: usize, message: String },
}

/// Progress information during registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterProgress {
    /// Images processed so far, successful or not
    pub completed: usize,
    /// Total images in the batch
    pub total: usize,
    /// Image just processed
    pub current_name: String,
}

/// Events while comparing a query image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// The query was fingerprinted
    QueryHashed { file_name: String, fingerprint: String },
    /// Ranking has started
    Started { total_references: usize },
    /// A reference was left out because its stored fingerprint is corrupt
    ReferenceSkipped { id: i64, reason: String },
    /// Comparison completed
    Completed(CompareSummary),
}

/// Summary of a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareSummary {
    /// References looked at
    pub total_references: usize,
    /// Matches returned after top-k truncation
    pub matches: usize,
    /// References skipped as corrupt
    pub skipped: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
