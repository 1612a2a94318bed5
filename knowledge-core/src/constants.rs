//! Global constants for the knowledge core
//!
//! Centralizes the tunable defaults so they are easy to audit against the
//! configuration surface.

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    // Embedding model
    pub const EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";
    pub const EMBEDDING_DIMENSION: usize = 384;
    pub const EMBEDDING_BATCH_SIZE: usize = 100;

    // Prompt budgeting
    pub const MAX_PROMPT_TOKENS_BUDGET: usize = 128_000;
    pub const TOKENS_PER_MESSAGE_OVERHEAD: usize = 4;
    pub const RECENT_HISTORY_MESSAGES: usize = 4;
    /// Main-history cap used when the tokenizer cannot be loaded
    pub const FALLBACK_HISTORY_MESSAGES: usize = 50;

    // Retrieval filtering
    pub const RESULTS_PER_TABLE: usize = 3;
    pub const PER_SOURCE_CAP: usize = 2;
    pub const MAX_TOTAL_RESULTS: usize = 5;
    pub const SCORE_THRESHOLD: f32 = 0.3;
    pub const DEDUP_SIMILARITY_THRESHOLD: f32 = 0.7;
    pub const KEYWORD_BOOST_PER_MATCH: f32 = 0.5;
    pub const KEYWORD_BOOST_CAP: f32 = 2.0;

    // Content store
    pub const STORE_URL: &str = "file:data/content.db";
    pub const POOL_SIZE: usize = 10;
    pub const BUSY_TIMEOUT_MS: u64 = 5000;
    pub const RECYCLE_SECONDS: u64 = 3600;

    // AI round-trip
    pub const AI_MAX_RETRIES: u32 = 3;
    pub const AI_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);
    pub const AI_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    // Reference resolution
    pub const MAX_REFERENCE_DEPTH: usize = 10;
}
