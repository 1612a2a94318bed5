//! Retrieval orchestrator
//!
//! Executes planned queries through the knowledge base manager and applies
//! the smart filtering pass: per-source caps, an action-keyword boost, and
//! near-duplicate elimination. Partial source failures never abort a
//! retrieval; they are logged inside the manager and surface only through
//! `total_queries`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::RetrievalConfig;
use crate::constants::defaults;
use crate::kb::{KnowledgeBaseManager, KnowledgeItem, SearchResults};
use crate::planner::QueryPlanner;
use crate::state::GameState;

pub struct RetrievalOrchestrator {
    kb: Arc<KnowledgeBaseManager>,
    planner: QueryPlanner,
    config: RetrievalConfig,
}

impl RetrievalOrchestrator {
    pub fn new(kb: Arc<KnowledgeBaseManager>, config: RetrievalConfig) -> Self {
        Self {
            kb,
            planner: QueryPlanner::new(),
            config,
        }
    }

    /// Plan and execute retrieval for a player action
    pub async fn retrieve(&self, action: &str, state: &GameState) -> SearchResults {
        let started = Instant::now();
        let queries = self.planner.plan(action, state);
        debug!(count = queries.len(), action, "planned retrieval queries");

        // Scores are normalized to [0, 1], so the configured similarity
        // threshold doubles as the pre-boost relevance floor.
        let mut by_source: BTreeMap<String, Vec<KnowledgeItem>> = BTreeMap::new();
        for query in &queries {
            let results = self
                .kb
                .search(
                    &query.text,
                    query.kb_filter.as_deref(),
                    self.config.results_per_table,
                    self.config.score_threshold,
                )
                .await;
            for item in results.items {
                by_source.entry(item.source.clone()).or_default().push(item);
            }
        }

        let mut all_items: Vec<KnowledgeItem> = Vec::new();
        for items in by_source.into_values() {
            let mut items = items;
            sort_stable(&mut items);
            items.truncate(self.config.per_source_cap);
            all_items.extend(items);
        }

        boost_action_relevance(&mut all_items, action);
        sort_stable(&mut all_items);

        let mut deduped = self.deduplicate(all_items);
        deduped.truncate(self.config.max_total_results);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if deduped.is_empty() {
            debug!(action, "retrieval produced no items");
        } else {
            info!(
                items = deduped.len(),
                queries = queries.len(),
                elapsed_ms,
                "retrieval complete"
            );
        }

        SearchResults {
            items: deduped,
            total_queries: queries.len(),
            elapsed_ms,
        }
    }

    /// Drop items whose normalized content overlaps an earlier (higher
    /// scored) item beyond the configured Jaccard threshold
    fn deduplicate(&self, items: Vec<KnowledgeItem>) -> Vec<KnowledgeItem> {
        let mut kept: Vec<KnowledgeItem> = Vec::new();
        let mut keys: Vec<HashSet<String>> = Vec::new();

        for item in items {
            let words = normalized_word_set(&item.content);
            let duplicate = keys
                .iter()
                .any(|seen| jaccard(&words, seen) >= self.config.dedup_similarity_threshold);
            if !duplicate {
                keys.push(words);
                kept.push(item);
            }
        }
        kept
    }

    /// Render retrieval results for prompt inclusion, grouped by source in
    /// a fixed priority order
    pub fn format_for_prompt(results: &SearchResults) -> String {
        if !results.has_results() {
            return String::new();
        }

        let mut grouped: BTreeMap<String, Vec<&KnowledgeItem>> = BTreeMap::new();
        for item in &results.items {
            grouped.entry(item.source.clone()).or_default().push(item);
        }

        let mut sources: Vec<&String> = grouped.keys().collect();
        sources.sort_by_key(|s| (source_priority(s), (*s).clone()));

        let mut sections = Vec::new();
        for source in sources {
            let header = title_case_source(source);
            let mut lines = Vec::new();
            for item in grouped[source].iter().take(2) {
                let mut content = item.content.trim().to_string();
                if !content.ends_with('.') {
                    content.push('.');
                }
                lines.push(format!("- {content}"));
            }
            if !lines.is_empty() {
                sections.push(format!("**{header}:**\n{}", lines.join("\n")));
            }
        }

        format!("**Relevant Information:**\n\n{}", sections.join("\n\n"))
    }
}

/// Sort descending by score with `(source, index)` as the tie-break so a
/// fixed input always produces the same ordering
fn sort_stable(items: &mut [KnowledgeItem]) {
    items.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| item_index(a).cmp(item_index(b)))
    });
}

fn item_index(item: &KnowledgeItem) -> &str {
    item.metadata
        .get("index")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

/// Add `min(0.5 * matches, 2.0)` for direct word overlap with the raw
/// player action
fn boost_action_relevance(items: &mut [KnowledgeItem], action: &str) {
    if action.trim().is_empty() {
        return;
    }
    let action_words: HashSet<String> = action
        .to_lowercase()
        .split_whitespace()
        .map(ToString::to_string)
        .collect();

    for item in items.iter_mut() {
        let content_words: HashSet<String> = item
            .content
            .to_lowercase()
            .split_whitespace()
            .map(ToString::to_string)
            .collect();
        let matches = action_words.intersection(&content_words).count();
        if matches > 0 {
            let boost = (matches as f32 * defaults::KEYWORD_BOOST_PER_MATCH)
                .min(defaults::KEYWORD_BOOST_CAP);
            item.relevance_score += boost;
        }
    }
}

/// Lowercase, strip separator punctuation, keep the first 15 tokens
fn normalized_word_set(content: &str) -> HashSet<String> {
    content
        .to_lowercase()
        .replace([':', '=', ','], " ")
        .split_whitespace()
        .take(15)
        .map(ToString::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f32 / union as f32
}

fn source_priority(source: &str) -> u8 {
    if source.starts_with("lore_") {
        return 5;
    }
    if source.starts_with("events_") {
        return 6;
    }
    match source {
        "spells" => 1,
        "monsters" => 2,
        "rules" | "rule_sections" => 3,
        "equipment" | "magic_items" => 4,
        _ => 10,
    }
}

fn title_case_source(source: &str) -> String {
    source
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Map;

    use crate::catalog::EntityKind;
    use crate::embeddings::{HashEmbedder, SharedEmbedder};
    use crate::error::Result;
    use crate::kb::{CatalogSearch, ScoredRow};

    /// Catalog stub that answers spell and monster searches from fixed rows
    struct FixtureCatalog;

    #[async_trait]
    impl CatalogSearch for FixtureCatalog {
        async fn search_kind(
            &self,
            kind: EntityKind,
            _query: &[f32],
            k: usize,
        ) -> Result<Vec<ScoredRow>> {
            let rows = match kind {
                EntityKind::Spells => vec![
                    ScoredRow {
                        index: "fireball".into(),
                        name: "Fireball".into(),
                        content: "Spell: Fireball Level 3 School: Evocation A bright streak \
                                  blossoms into an explosion of flame"
                            .into(),
                        distance: 0.2,
                    },
                    ScoredRow {
                        index: "ice-knife".into(),
                        name: "Ice Knife".into(),
                        content: "Spell: Ice Knife Level 1 School: Conjuration".into(),
                        distance: 0.9,
                    },
                ],
                EntityKind::Monsters => vec![ScoredRow {
                    index: "goblin".into(),
                    name: "Goblin".into(),
                    content: "Monster: Goblin Type: humanoid CR: 0.25 HP: 7".into(),
                    distance: 0.3,
                }],
                _ => vec![],
            };
            Ok(rows.into_iter().take(k).collect())
        }
    }

    fn orchestrator() -> RetrievalOrchestrator {
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new("hash-stub".into(), 64));
        let kb = Arc::new(KnowledgeBaseManager::new(Arc::new(FixtureCatalog), embedder));
        let config = RetrievalConfig {
            score_threshold: 0.0,
            ..RetrievalConfig::default()
        };
        RetrievalOrchestrator::new(kb, config)
    }

    #[tokio::test]
    async fn spell_lookup_scenario_returns_spell_and_monster_items() {
        let orch = orchestrator();
        let state = GameState::new("c1");
        let results = orch.retrieve("Cast Fireball on the goblin", &state).await;

        assert!(results.items.len() <= 5);
        assert!(results
            .items
            .iter()
            .any(|i| i.source == "spells" && i.content.contains("Fireball")));
        assert!(results
            .items
            .iter()
            .any(|i| i.source == "monsters" && i.content.contains("Goblin")));

        // No duplicate content strings
        let mut contents: Vec<&str> = results.items.iter().map(|i| i.content.as_str()).collect();
        contents.sort_unstable();
        contents.dedup();
        assert_eq!(contents.len(), results.items.len());
    }

    #[tokio::test]
    async fn retrieval_is_order_stable_for_fixed_input() {
        let orch = orchestrator();
        let state = GameState::new("c1");
        let first = orch.retrieve("Cast Fireball on the goblin", &state).await;
        let second = orch.retrieve("Cast Fireball on the goblin", &state).await;
        let keys =
            |r: &SearchResults| -> Vec<String> { r.items.iter().map(|i| i.content.clone()).collect() };
        assert_eq!(keys(&first), keys(&second));
    }

    #[tokio::test]
    async fn keyword_boost_prefers_items_matching_the_action() {
        let orch = orchestrator();
        let state = GameState::new("c1");
        let results = orch.retrieve("Cast Fireball on the goblin", &state).await;
        // Fireball overlaps the action text, so it outranks Ice Knife.
        let spell_positions: Vec<&str> = results
            .items
            .iter()
            .filter(|i| i.source == "spells")
            .map(|i| i.content.as_str())
            .collect();
        assert!(spell_positions[0].contains("Fireball"));
    }

    #[test]
    fn near_duplicate_contents_collapse() {
        let orch = orchestrator();
        let make = |content: &str, score: f32| KnowledgeItem {
            content: content.into(),
            source: "spells".into(),
            relevance_score: score,
            metadata: Map::new(),
        };
        let items = vec![
            make("Spell: Fireball Level 3 School: Evocation explosion of flame", 0.9),
            make("Spell: Fireball, Level 3, School = Evocation explosion of flame", 0.8),
            make("Monster: Goblin Type: humanoid", 0.7),
        ];
        let deduped = orch.deduplicate(items);
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn formatting_groups_by_source_priority() {
        let make = |source: &str, content: &str| KnowledgeItem {
            content: content.into(),
            source: source.into(),
            relevance_score: 0.9,
            metadata: Map::new(),
        };
        let results = SearchResults {
            items: vec![
                make("monsters", "Monster: Goblin HP: 7"),
                make("spells", "Spell: Fireball Level 3"),
            ],
            total_queries: 2,
            elapsed_ms: 1.0,
        };
        let formatted = RetrievalOrchestrator::format_for_prompt(&results);
        assert!(formatted.starts_with("**Relevant Information:**"));
        let spells_at = formatted.find("**Spells:**").unwrap();
        let monsters_at = formatted.find("**Monsters:**").unwrap();
        assert!(spells_at < monsters_at);
        assert!(formatted.contains("- Spell: Fireball Level 3."));
    }

    /// Catalog stub with nothing to return
    struct BareCatalog;

    #[async_trait]
    impl CatalogSearch for BareCatalog {
        async fn search_kind(
            &self,
            _kind: EntityKind,
            _query: &[f32],
            _k: usize,
        ) -> Result<Vec<ScoredRow>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn nonsense_action_returns_empty_without_crashing() {
        let embedder: SharedEmbedder = Arc::new(HashEmbedder::new("hash-stub".into(), 64));
        let kb = Arc::new(KnowledgeBaseManager::new(Arc::new(BareCatalog), embedder));
        let orch = RetrievalOrchestrator::new(kb, RetrievalConfig::default());
        let state = GameState::new("c1");
        let results = orch.retrieve("zzz qqq xyzzy", &state).await;
        assert!(!results.has_results());
        assert!(results.total_queries >= 1);
    }
}
