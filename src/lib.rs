//! # Image Similarity Checker
//!
//! Register reference images, then find which of them an uploaded image
//! is a near-duplicate of.
//!
//! ## Core Philosophy
//! - **Never guess** - an unreadable image or a corrupt stored hash is
//!   reported, never replaced by a default
//! - **Deterministic** - the same inputs always rank the same way
//!
//! ## Architecture
//! The library is split into a core engine (front-end-agnostic) and presentation layers:
//! - `core` - Fingerprinting, scoring, ranking, stores and request handlers
//! - `config` - Explicit application configuration
//! - `events` - Event-driven progress reporting
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use crate::config::AppConfig;
pub use error::{Result, SimilarityError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// overrides `default_filter` when set.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
