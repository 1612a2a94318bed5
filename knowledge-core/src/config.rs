//! Configuration surface for the knowledge core
//!
//! All structs deserialize from TOML and carry the documented defaults, so a
//! missing section or field falls back to production values.

use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Embedding model identity. Changing the model requires a full re-index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name used for metadata and provider selection
    pub model_name: String,
    /// Vector dimension every stored embedding must have
    pub dimension: usize,
    /// Batch size used by the indexing job
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: defaults::EMBEDDING_MODEL.to_string(),
            dimension: defaults::EMBEDDING_DIMENSION,
            batch_size: defaults::EMBEDDING_BATCH_SIZE,
        }
    }
}

/// Prompt assembly budget and window sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Hard token ceiling for the assembled message list
    pub max_tokens_budget: usize,
    /// Fixed overhead added per message on top of its content tokens
    pub tokens_per_message_overhead: usize,
    /// Number of trailing chat messages always kept verbatim
    pub recent_history_messages: usize,
    /// Main-history message cap applied when token counting is unavailable
    pub fallback_history_messages: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_tokens_budget: defaults::MAX_PROMPT_TOKENS_BUDGET,
            tokens_per_message_overhead: defaults::TOKENS_PER_MESSAGE_OVERHEAD,
            recent_history_messages: defaults::RECENT_HISTORY_MESSAGES,
            fallback_history_messages: defaults::FALLBACK_HISTORY_MESSAGES,
        }
    }
}

/// Retrieval filtering knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest-neighbor fan-out per catalog table
    pub results_per_table: usize,
    /// Maximum results kept per knowledge source after score sorting
    pub per_source_cap: usize,
    /// Maximum results across all sources
    pub max_total_results: usize,
    /// Minimum normalized similarity for an item to survive
    pub score_threshold: f32,
    /// Jaccard similarity above which two items are duplicates
    pub dedup_similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            results_per_table: defaults::RESULTS_PER_TABLE,
            per_source_cap: defaults::PER_SOURCE_CAP,
            max_total_results: defaults::MAX_TOTAL_RESULTS,
            score_threshold: defaults::SCORE_THRESHOLD,
            dedup_similarity_threshold: defaults::DEDUP_SIMILARITY_THRESHOLD,
        }
    }
}

/// Content store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database URL (`file:` path or `:memory:`)
    pub url: String,
    /// Connection pool size
    pub pool_size: usize,
    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
    /// Synchronous pragma value
    pub synchronous: String,
    /// Pool connection recycle interval in seconds
    pub recycle_seconds: u64,
    /// Attempt native vector search at open time
    pub vector_extension: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: defaults::STORE_URL.to_string(),
            pool_size: defaults::POOL_SIZE,
            busy_timeout_ms: defaults::BUSY_TIMEOUT_MS,
            synchronous: "NORMAL".to_string(),
            recycle_seconds: defaults::RECYCLE_SECONDS,
            vector_extension: true,
        }
    }
}

/// AI client settings (the transport itself is a collaborator)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub base_url: String,
    pub model_name: String,
    pub temperature: f32,
    /// Maximum retry attempts for empty responses
    pub max_retries: u32,
    /// Base delay before the first retry, in milliseconds
    pub retry_base_delay_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_retries: defaults::AI_MAX_RETRIES,
            retry_base_delay_ms: defaults::AI_RETRY_BASE_DELAY.as_millis() as u64,
            request_timeout_secs: defaults::AI_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Top-level configuration aggregating every subsystem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub embedding: EmbeddingConfig,
    pub prompt: PromptConfig,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
    pub ai: AiConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CoreConfig::default();
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.prompt.max_tokens_budget, 128_000);
        assert_eq!(config.prompt.tokens_per_message_overhead, 4);
        assert_eq!(config.prompt.recent_history_messages, 4);
        assert_eq!(config.retrieval.per_source_cap, 2);
        assert_eq!(config.retrieval.max_total_results, 5);
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.store.synchronous, "NORMAL");
    }

    #[test]
    fn partial_config_fills_missing_fields() {
        let parsed: CoreConfig =
            serde_json::from_str(r#"{"retrieval": {"max_total_results": 8}}"#).unwrap();
        assert_eq!(parsed.retrieval.max_total_results, 8);
        assert_eq!(parsed.retrieval.per_source_cap, 2);
        assert_eq!(parsed.embedding.model_name, "all-MiniLM-L6-v2");
    }
}
