//! Text embedding abstraction
//!
//! The real embedding model is an external blob consulted through the
//! [`EmbeddingProvider`] trait. The crate ships a deterministic hash-based
//! stub used in tests and whenever a real provider is not wired in; the
//! stub preserves every downstream contract (identical inputs get identical
//! vectors, all vectors are unit-norm) at the cost of semantic quality.

pub mod hash;
pub mod provider;
pub mod similarity;

use std::sync::Arc;

pub use hash::HashEmbedder;
pub use provider::{utils, EmbeddingProvider};
pub use similarity::{cosine_similarity, l2_to_similarity};

use crate::config::EmbeddingConfig;

/// Shared handle to the process-wide embedding model
pub type SharedEmbedder = Arc<dyn EmbeddingProvider>;

/// Build the default provider for a configuration. Real model backends are
/// injected by the host application; without one the deterministic stub is
/// used and a warning is logged.
pub fn default_provider(config: &EmbeddingConfig) -> SharedEmbedder {
    Arc::new(HashEmbedder::new(
        config.model_name.clone(),
        config.dimension,
    ))
}
