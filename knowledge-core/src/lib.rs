#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # GM Knowledge Core
//!
//! Domain models, retrieval planning, and prompt assembly for an AI-driven
//! tabletop game master. This crate is storage-agnostic: it defines the
//! [`kb::CatalogSearch`] trait the storage crate implements, and nothing in
//! here holds a database handle.
//!
//! ## Core Concepts
//!
//! - **Catalog**: 25 typed rule-entity kinds grouped into content packs,
//!   cross-linked by by-value `{index, name, url}` reference triples
//! - **Knowledge base**: hybrid vector search over catalog tables plus
//!   per-campaign in-memory lore and event collections
//! - **Planner**: deterministic extraction of retrieval queries from a raw
//!   player action
//! - **Assembler**: token-budgeted construction of the AI message list with
//!   cross-turn reuse of the last retrieval context
//!
//! ## Module Organization
//!
//! - [`catalog`]: entity models, kinds, packs, references
//! - [`embeddings`]: provider trait, deterministic stub, similarity metrics
//! - [`kb`]: knowledge base manager and campaign collections
//! - [`planner`]: action analysis into prioritized queries
//! - [`retrieval`]: query execution, filtering, and formatting
//! - [`prompt`]: message-list assembly under a token budget
//! - [`ai`]: AI client contract and retry policy
//! - [`state`], [`chat`]: game-state and chat-history value types
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gm_knowledge_core::config::CoreConfig;
//! use gm_knowledge_core::embeddings;
//! use gm_knowledge_core::kb::{CatalogSearch, KnowledgeBaseManager};
//! use gm_knowledge_core::prompt::PromptAssembler;
//! use gm_knowledge_core::retrieval::RetrievalOrchestrator;
//! use gm_knowledge_core::state::GameState;
//!
//! # async fn example(catalog: Arc<dyn CatalogSearch>) {
//! let config = CoreConfig::default();
//! let embedder = embeddings::default_provider(&config.embedding);
//! let kb = Arc::new(KnowledgeBaseManager::new(catalog, embedder));
//! let orchestrator = Arc::new(RetrievalOrchestrator::new(kb, config.retrieval));
//! let assembler = PromptAssembler::new(orchestrator, config.prompt);
//!
//! let mut state = GameState::new("campaign-1");
//! let messages = assembler
//!     .build(&mut state, Some("Cast Fireball on the goblin"), None)
//!     .await;
//! # let _ = messages;
//! # }
//! ```

pub mod ai;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod kb;
pub mod planner;
pub mod prompt;
pub mod retrieval;
pub mod state;

// Re-export commonly used types
pub use ai::{AiClient, AiCompletion, AiResponse, DiceRequest, RetryingAiClient, TokenUsage};
pub use catalog::{CatalogEntity, ContentPack, EntityKind, ResourceRef};
pub use chat::{ChatMessage, PromptMessage, Role};
pub use config::CoreConfig;
pub use embeddings::{EmbeddingProvider, HashEmbedder, SharedEmbedder};
pub use error::{Error, Result};
pub use kb::{CatalogSearch, KbType, KnowledgeBaseManager, KnowledgeItem, ScoredRow, SearchResults};
pub use planner::{PlannedQuery, QueryKind, QueryPlanner};
pub use prompt::PromptAssembler;
pub use retrieval::RetrievalOrchestrator;
pub use state::GameState;
