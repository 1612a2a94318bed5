//! Knowledge base manager
//!
//! Routes logical KB types onto backing catalog tables and in-memory
//! campaign collections, embeds each query once, and merges scored results
//! across sources.

pub mod documents;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::catalog::EntityKind;
use crate::embeddings::{l2_to_similarity, SharedEmbedder};
use crate::error::Result;

pub use documents::{CampaignStore, EventRecord, LoreDocument};

/// Logical retrieval source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KbType {
    Rules,
    CharacterOptions,
    Spells,
    Monsters,
    Equipment,
    Mechanics,
    CampaignLore(String),
    CampaignEvents(String),
}

impl KbType {
    /// Parse a label like `spells` or `lore_<campaign>`
    pub fn parse(label: &str) -> Option<KbType> {
        match label {
            "rules" => Some(KbType::Rules),
            "character_options" => Some(KbType::CharacterOptions),
            "spells" => Some(KbType::Spells),
            "monsters" => Some(KbType::Monsters),
            "equipment" => Some(KbType::Equipment),
            "mechanics" => Some(KbType::Mechanics),
            _ => {
                if let Some(id) = label.strip_prefix("lore_") {
                    Some(KbType::CampaignLore(id.to_string()))
                } else {
                    label
                        .strip_prefix("events_")
                        .map(|id| KbType::CampaignEvents(id.to_string()))
                }
            }
        }
    }

    /// Source label used in results and logs
    pub fn label(&self) -> String {
        match self {
            KbType::Rules => "rules".to_string(),
            KbType::CharacterOptions => "character_options".to_string(),
            KbType::Spells => "spells".to_string(),
            KbType::Monsters => "monsters".to_string(),
            KbType::Equipment => "equipment".to_string(),
            KbType::Mechanics => "mechanics".to_string(),
            KbType::CampaignLore(id) => format!("lore_{id}"),
            KbType::CampaignEvents(id) => format!("events_{id}"),
        }
    }

    /// Catalog tables backing this KB type; empty for campaign collections
    pub fn tables(&self) -> &'static [EntityKind] {
        match self {
            KbType::Rules => &[EntityKind::Rules, EntityKind::RuleSections],
            KbType::CharacterOptions => &[
                EntityKind::Classes,
                EntityKind::Subclasses,
                EntityKind::Races,
                EntityKind::Subraces,
                EntityKind::Backgrounds,
                EntityKind::Feats,
                EntityKind::Traits,
            ],
            KbType::Spells => &[EntityKind::Spells],
            KbType::Monsters => &[EntityKind::Monsters],
            KbType::Equipment => &[EntityKind::Equipment, EntityKind::MagicItems],
            KbType::Mechanics => &[
                EntityKind::Conditions,
                EntityKind::Skills,
                EntityKind::Proficiencies,
                EntityKind::DamageTypes,
                EntityKind::Languages,
                EntityKind::Alignments,
                EntityKind::AbilityScores,
            ],
            KbType::CampaignLore(_) | KbType::CampaignEvents(_) => &[],
        }
    }

    /// The fixed catalog-backed KB types
    pub fn catalog_types() -> [KbType; 6] {
        [
            KbType::Rules,
            KbType::CharacterOptions,
            KbType::Spells,
            KbType::Monsters,
            KbType::Equipment,
            KbType::Mechanics,
        ]
    }
}

/// One retrieved knowledge snippet
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeItem {
    pub content: String,
    pub source: String,
    /// Similarity in [0, 1] before any orchestrator boost
    pub relevance_score: f32,
    pub metadata: Map<String, Value>,
}

/// Result of one knowledge-base search
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub items: Vec<KnowledgeItem>,
    pub total_queries: usize,
    pub elapsed_ms: f64,
}

impl SearchResults {
    pub fn has_results(&self) -> bool {
        !self.items.is_empty()
    }
}

/// A catalog row scored by vector distance
#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub index: String,
    pub name: String,
    pub content: String,
    pub distance: f32,
}

/// Nearest-neighbor search over one catalog table. Implemented by the
/// storage crate; the manager never sees a database handle.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search_kind(
        &self,
        kind: EntityKind,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRow>>;
}

/// Hybrid search over catalog tables and campaign collections
pub struct KnowledgeBaseManager {
    catalog: Arc<dyn CatalogSearch>,
    embedder: SharedEmbedder,
    campaigns: CampaignStore,
    max_results: usize,
}

impl KnowledgeBaseManager {
    pub fn new(catalog: Arc<dyn CatalogSearch>, embedder: SharedEmbedder) -> Self {
        Self {
            catalog,
            embedder,
            campaigns: CampaignStore::new(),
            max_results: crate::constants::defaults::MAX_TOTAL_RESULTS,
        }
    }

    /// Campaign lore/event collections, for population at activation time
    pub fn campaigns(&self) -> &CampaignStore {
        &self.campaigns
    }

    /// Load a campaign's lore from a JSON object, one document per key.
    /// Called once at campaign activation; replaces any previous lore.
    pub fn add_campaign_lore(&self, campaign_id: &str, data: &Map<String, Value>) {
        let source = format!("lore_{campaign_id}");
        let documents = LoreDocument::from_json_map(data, &source);
        self.campaigns.set_lore(campaign_id, documents);
    }

    /// Append a play event to the campaign's event log
    pub fn add_event(&self, campaign_id: &str, summary: &str, keywords: Vec<String>) {
        self.campaigns.append_event(campaign_id, summary, keywords);
    }

    /// Search the requested KB types (all known sources when `kb_types` is
    /// `None`), returning at most the global cap of items sorted by
    /// descending relevance.
    pub async fn search(
        &self,
        query: &str,
        kb_types: Option<&[KbType]>,
        k: usize,
        score_threshold: f32,
    ) -> SearchResults {
        let started = Instant::now();

        let query_embedding = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                error!("failed to embed query: {e}");
                return SearchResults {
                    elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    ..SearchResults::default()
                };
            }
        };

        let requested: Vec<KbType> = match kb_types {
            Some(types) => types.to_vec(),
            None => {
                let mut all: Vec<KbType> = KbType::catalog_types().to_vec();
                for id in self.campaigns.campaign_ids() {
                    all.push(KbType::CampaignLore(id.clone()));
                    all.push(KbType::CampaignEvents(id));
                }
                all
            }
        };

        // A table reachable through several KB types is searched once.
        let mut tables: BTreeSet<EntityKind> = BTreeSet::new();
        for kb in &requested {
            tables.extend(kb.tables().iter().copied());
        }

        let mut all_items: Vec<KnowledgeItem> = Vec::new();
        let mut total_queries = 0usize;

        for kind in &tables {
            total_queries += 1;
            match self.catalog.search_kind(*kind, &query_embedding, k).await {
                Ok(rows) => {
                    for row in rows {
                        let score = l2_to_similarity(row.distance);
                        if score < score_threshold {
                            continue;
                        }
                        let mut metadata = Map::new();
                        metadata.insert("index".into(), Value::String(row.index.clone()));
                        metadata.insert("name".into(), Value::String(row.name.clone()));
                        metadata.insert(
                            "table".into(),
                            Value::String(kind.table_name().to_string()),
                        );
                        all_items.push(KnowledgeItem {
                            content: row.content,
                            source: kind.table_name().to_string(),
                            relevance_score: score,
                            metadata,
                        });
                    }
                }
                Err(e) => {
                    error!(table = kind.table_name(), "catalog search failed: {e}");
                }
            }
        }

        for kb in &requested {
            match kb {
                KbType::CampaignLore(id) => {
                    total_queries += 1;
                    let hits = self
                        .campaigns
                        .search_lore(id, &query_embedding, &self.embedder, k, score_threshold)
                        .await;
                    all_items.extend(hits);
                }
                KbType::CampaignEvents(id) => {
                    total_queries += 1;
                    let hits = self
                        .campaigns
                        .search_events(id, &query_embedding, &self.embedder, k, score_threshold)
                        .await;
                    all_items.extend(hits);
                }
                _ => {}
            }
        }

        // Ties break on (source, index) so a fixed input always yields the
        // same ordering
        all_items.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| {
                    let index_of = |item: &KnowledgeItem| {
                        item.metadata
                            .get("index")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string()
                    };
                    index_of(a).cmp(&index_of(b))
                })
        });

        // Dedup by source plus content prefix
        let mut unique: Vec<KnowledgeItem> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for item in all_items {
            let prefix: String = item.content.chars().take(100).collect();
            let key = format!("{}:{}", item.source, prefix);
            if seen.insert(key) {
                unique.push(item);
            }
        }
        unique.truncate(self.max_results);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            items = unique.len(),
            total_queries, elapsed_ms, "knowledge base search complete"
        );

        SearchResults {
            items: unique,
            total_queries,
            elapsed_ms,
        }
    }
}
