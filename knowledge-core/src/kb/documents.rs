//! In-memory campaign lore and event collections
//!
//! Lore is populated once at campaign activation; events append during play
//! in wall-clock order under a per-campaign mutex. Document embeddings are
//! computed lazily and cached on the document for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::info;

use crate::embeddings::{cosine_similarity, SharedEmbedder};
use crate::kb::KnowledgeItem;

/// One campaign lore entry
#[derive(Debug, Clone)]
pub struct LoreDocument {
    pub key: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    pub embedding: Option<Vec<f32>>,
}

impl LoreDocument {
    pub fn new(key: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            metadata: Map::new(),
            embedding: None,
        }
    }

    /// Flatten a JSON object into lore documents, one per top-level key.
    /// Strings become `key: value`; objects render their scalar fields;
    /// lists keep their first ten entries.
    pub fn from_json_map(data: &Map<String, Value>, source: &str) -> Vec<LoreDocument> {
        let mut documents = Vec::with_capacity(data.len());
        for (key, value) in data {
            let (content, doc_type) = match value {
                Value::String(s) => (format!("{key}: {s}"), "text"),
                Value::Object(fields) => {
                    let title = title_case(key);
                    let mut parts = vec![format!("{title}:")];
                    for (k, v) in fields {
                        match v {
                            Value::String(s) => parts.push(format!("  {k}: {s}")),
                            Value::Number(n) => parts.push(format!("  {k}: {n}")),
                            Value::Bool(b) => parts.push(format!("  {k}: {b}")),
                            _ => {}
                        }
                    }
                    (parts.join("\n"), "structured")
                }
                Value::Array(items) => {
                    let rendered: Vec<String> =
                        items.iter().take(10).map(render_scalar).collect();
                    (format!("{key}: {}", rendered.join(", ")), "list")
                }
                other => (format!("{key}: {other}"), "other"),
            };

            let mut metadata = Map::new();
            metadata.insert("key".into(), Value::String(key.clone()));
            metadata.insert("source".into(), Value::String(source.to_string()));
            metadata.insert("type".into(), Value::String(doc_type.to_string()));

            documents.push(LoreDocument {
                key: key.clone(),
                content,
                metadata,
                embedding: None,
            });
        }
        documents
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
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

/// One appended play event
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub summary: String,
    pub keywords: Vec<String>,
    pub embedding: Option<Vec<f32>>,
}

impl EventRecord {
    /// Textual view used for embedding and retrieval
    pub fn content(&self) -> String {
        let date = self.timestamp.format("%Y-%m-%d");
        if self.keywords.is_empty() {
            format!("[{date}] {}", self.summary)
        } else {
            format!(
                "[{date}] {}\nKeywords: {}",
                self.summary,
                self.keywords.join(", ")
            )
        }
    }
}

#[derive(Default)]
struct CampaignData {
    lore: Vec<LoreDocument>,
    events: Vec<EventRecord>,
}

/// Per-campaign in-memory collections, each behind its own mutex
#[derive(Default)]
pub struct CampaignStore {
    campaigns: RwLock<HashMap<String, Arc<Mutex<CampaignData>>>>,
}

impl CampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn campaign(&self, id: &str) -> Arc<Mutex<CampaignData>> {
        if let Some(data) = self.campaigns.read().get(id) {
            return Arc::clone(data);
        }
        let mut write = self.campaigns.write();
        Arc::clone(write.entry(id.to_string()).or_default())
    }

    /// Campaign ids with any registered collection
    pub fn campaign_ids(&self) -> Vec<String> {
        self.campaigns.read().keys().cloned().collect()
    }

    /// Replace the lore collection for a campaign (activation time)
    pub fn set_lore(&self, campaign_id: &str, documents: Vec<LoreDocument>) {
        let data = self.campaign(campaign_id);
        let count = documents.len();
        data.lock().lore = documents;
        info!(campaign_id, count, "campaign lore loaded");
    }

    /// Append an event in wall-clock order
    pub fn append_event(&self, campaign_id: &str, summary: &str, keywords: Vec<String>) {
        let data = self.campaign(campaign_id);
        let record = EventRecord {
            timestamp: Utc::now(),
            summary: summary.to_string(),
            keywords,
            embedding: None,
        };
        data.lock().events.push(record);
        info!(campaign_id, summary, "campaign event recorded");
    }

    pub async fn search_lore(
        &self,
        campaign_id: &str,
        query: &[f32],
        embedder: &SharedEmbedder,
        k: usize,
        score_threshold: f32,
    ) -> Vec<KnowledgeItem> {
        let data = self.campaign(campaign_id);
        let source = format!("lore_{campaign_id}");

        // Snapshot texts missing embeddings without holding the lock across
        // the embed call.
        let missing: Vec<(usize, String)> = {
            let guard = data.lock();
            guard
                .lore
                .iter()
                .enumerate()
                .filter(|(_, d)| d.embedding.is_none())
                .map(|(i, d)| (i, d.content.clone()))
                .collect()
        };
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|(_, t)| t.clone()).collect();
            if let Ok(vectors) = embedder.embed_batch(&texts).await {
                let mut guard = data.lock();
                for ((i, _), vector) in missing.iter().zip(vectors) {
                    if let Some(doc) = guard.lore.get_mut(*i) {
                        if doc.embedding.is_none() {
                            doc.embedding = Some(vector);
                        }
                    }
                }
            }
        }

        let scored: Vec<(f32, String, Map<String, Value>)> = {
            let guard = data.lock();
            guard
                .lore
                .iter()
                .filter_map(|doc| {
                    let embedding = doc.embedding.as_ref()?;
                    let score = cosine_similarity(query, embedding);
                    (score >= score_threshold).then(|| {
                        (score, doc.content.clone(), doc.metadata.clone())
                    })
                })
                .collect()
        };

        rank_and_truncate(scored, &source, k)
    }

    pub async fn search_events(
        &self,
        campaign_id: &str,
        query: &[f32],
        embedder: &SharedEmbedder,
        k: usize,
        score_threshold: f32,
    ) -> Vec<KnowledgeItem> {
        let data = self.campaign(campaign_id);
        let source = format!("events_{campaign_id}");

        let missing: Vec<(usize, String)> = {
            let guard = data.lock();
            guard
                .events
                .iter()
                .enumerate()
                .filter(|(_, e)| e.embedding.is_none())
                .map(|(i, e)| (i, e.content()))
                .collect()
        };
        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|(_, t)| t.clone()).collect();
            if let Ok(vectors) = embedder.embed_batch(&texts).await {
                let mut guard = data.lock();
                for ((i, _), vector) in missing.iter().zip(vectors) {
                    if let Some(event) = guard.events.get_mut(*i) {
                        if event.embedding.is_none() {
                            event.embedding = Some(vector);
                        }
                    }
                }
            }
        }

        let scored: Vec<(f32, String, Map<String, Value>)> = {
            let guard = data.lock();
            guard
                .events
                .iter()
                .filter_map(|event| {
                    let embedding = event.embedding.as_ref()?;
                    let score = cosine_similarity(query, embedding);
                    (score >= score_threshold).then(|| {
                        let mut metadata = Map::new();
                        metadata.insert(
                            "timestamp".into(),
                            Value::String(event.timestamp.to_rfc3339()),
                        );
                        metadata.insert(
                            "keywords".into(),
                            Value::Array(
                                event
                                    .keywords
                                    .iter()
                                    .map(|kw| Value::String(kw.clone()))
                                    .collect(),
                            ),
                        );
                        (score, event.content(), metadata)
                    })
                })
                .collect()
        };

        rank_and_truncate(scored, &source, k)
    }
}

fn rank_and_truncate(
    mut scored: Vec<(f32, String, Map<String, Value>)>,
    source: &str,
    k: usize,
) -> Vec<KnowledgeItem> {
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(score, content, metadata)| KnowledgeItem {
            content,
            source: source.to_string(),
            relevance_score: score,
            metadata,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;

    fn embedder() -> SharedEmbedder {
        Arc::new(HashEmbedder::new("hash-stub".into(), 64))
    }

    #[tokio::test]
    async fn exact_lore_match_ranks_first() {
        let store = CampaignStore::new();
        store.set_lore(
            "c1",
            vec![
                LoreDocument::new("capital", "capital: The city of Highspire"),
                LoreDocument::new("river", "river: The Serpentine flows east"),
            ],
        );

        let embedder = embedder();
        let query = embedder.embed("capital: The city of Highspire").await.unwrap();
        let hits = store.search_lore("c1", &query, &embedder, 5, -1.0).await;

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "capital: The city of Highspire");
        assert!((hits[0].relevance_score - 1.0).abs() < 1e-5);
        assert_eq!(hits[0].source, "lore_c1");
    }

    #[tokio::test]
    async fn events_append_in_order_and_truncate_to_k() {
        let store = CampaignStore::new();
        for i in 0..4 {
            store.append_event("c1", &format!("event number {i}"), vec![]);
        }
        let embedder = embedder();
        let query = embedder.embed("event number 0").await.unwrap();
        let hits = store.search_events("c1", &query, &embedder, 2, -1.0).await;
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn json_map_flattens_to_documents() {
        let data = serde_json::json!({
            "world_name": "Aerith",
            "the_old_empire": {"era": "second age", "ruler": "Empress Vail"},
            "regions": ["north", "south", "east"]
        });
        let Value::Object(map) = data else {
            panic!("expected object")
        };
        let docs = LoreDocument::from_json_map(&map, "lore_c1");
        assert_eq!(docs.len(), 3);

        let by_key: HashMap<&str, &LoreDocument> =
            docs.iter().map(|d| (d.key.as_str(), d)).collect();
        assert_eq!(by_key["world_name"].content, "world_name: Aerith");
        assert!(by_key["the_old_empire"]
            .content
            .starts_with("The Old Empire:"));
        assert_eq!(by_key["regions"].content, "regions: north, south, east");
    }

    #[test]
    fn event_content_includes_keywords() {
        let event = EventRecord {
            timestamp: Utc::now(),
            summary: "Goblin ambush on the north road".into(),
            keywords: vec!["goblin".into(), "ambush".into()],
            embedding: None,
        };
        let content = event.content();
        assert!(content.contains("Goblin ambush on the north road"));
        assert!(content.ends_with("Keywords: goblin, ambush"));
    }
}
