//! Vector search over the catalog tables
//!
//! The native path pushes an L2 distance computation into SQL with the
//! query vector bound as a packed-f32 blob. When the vector functions are
//! missing (probed at open) or fail at query time, the linear-scan path
//! loads every embedded row and ranks by cosine similarity in-process;
//! results are identical, latency is higher.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::warn;

use gm_knowledge_core::embeddings::cosine_similarity;
use gm_knowledge_core::kb::{CatalogSearch, ScoredRow};
use gm_knowledge_core::{EntityKind, Error, Result};

use crate::fields::field_map;
use crate::rows;
use crate::ContentStore;

pub struct StoreCatalogSearch {
    store: Arc<ContentStore>,
}

impl StoreCatalogSearch {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Search a table addressed by name. The name must be on the kind
    /// whitelist; anything else is rejected before SQL is built.
    pub async fn search_table(
        &self,
        table: &str,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRow>> {
        let kind = EntityKind::from_table_name(table)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown table: {table}")))?;
        self.search_kind(kind, query, k).await
    }

    async fn native_search(
        &self,
        kind: EntityKind,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRow>> {
        let fields = field_map(kind);
        let sql = format!(
            "SELECT t.*, vector_distance_l2(t.embedding, ?) AS distance \
             FROM {table} t WHERE t.embedding IS NOT NULL \
             ORDER BY distance LIMIT ?",
            table = kind.table_name()
        );

        let conn = self.store.acquire().await?;
        let mut result = conn
            .query(
                &sql,
                libsql::params![rows::vec_to_blob(query), k as i64],
            )
            .await
            .map_err(|e| Error::database("vector search", e))?;
        let names = rows::column_names(&result);

        let mut scored = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::database("vector search", e))?
        {
            let mut map = rows::row_to_json_map(&row, &names, &fields)?;
            let distance = map
                .remove("distance")
                .and_then(|v| v.as_f64())
                .ok_or_else(|| Error::database("vector search", "missing distance"))?;
            scored.push(scored_row(kind, map, distance as f32));
        }
        self.store.release(conn);
        Ok(scored)
    }

    async fn linear_scan(
        &self,
        kind: EntityKind,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRow>> {
        let fields = field_map(kind);
        let sql = format!(
            "SELECT t.* FROM {table} t WHERE t.embedding IS NOT NULL",
            table = kind.table_name()
        );

        let conn = self.store.acquire().await?;
        let mut result = conn
            .query(&sql, ())
            .await
            .map_err(|e| Error::database("vector scan", e))?;
        let names = rows::column_names(&result);
        let embedding_column = names
            .iter()
            .position(|n| n == "embedding")
            .ok_or_else(|| Error::database("vector scan", "missing embedding column"))?;

        let mut scored = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| Error::database("vector scan", e))?
        {
            let blob: Vec<u8> = row
                .get(embedding_column as i32)
                .map_err(|e| Error::database("vector scan", e))?;
            let embedding = rows::blob_to_vec(&blob);
            let similarity = cosine_similarity(query, &embedding);
            let distance = 1.0 - similarity;

            let map = rows::row_to_json_map(&row, &names, &fields)?;
            scored.push(scored_row(kind, map, distance));
        }
        self.store.release(conn);

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[async_trait]
impl CatalogSearch for StoreCatalogSearch {
    async fn search_kind(
        &self,
        kind: EntityKind,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredRow>> {
        if self.store.has_native_vector() {
            match self.native_search(kind, query, k).await {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    warn!(
                        table = kind.table_name(),
                        "native vector search failed, switching to linear scan: {e}"
                    );
                    self.store.disable_native_vector();
                }
            }
        }
        self.linear_scan(kind, query, k).await
    }
}

fn scored_row(kind: EntityKind, map: Map<String, Value>, distance: f32) -> ScoredRow {
    let index = map
        .get("index")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let content = content_text(kind, &map);
    ScoredRow {
        index,
        name,
        content,
        distance,
    }
}

/// Kind-specific textual view of a catalog row, shared by retrieval and
/// the indexing job so stored vectors match what search renders
pub fn content_text(kind: EntityKind, fields: &Map<String, Value>) -> String {
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown");
    let mut parts = vec![format!("{}: {name}", kind.display_label())];

    match kind {
        EntityKind::Spells => {
            if let Some(level) = fields.get("level").and_then(Value::as_i64) {
                parts.push(format!("Level {level}"));
            }
            if let Some(school) = nested_name(fields.get("school")) {
                parts.push(format!("School: {school}"));
            }
            if let Some(desc) = description_text(fields) {
                parts.push(desc);
            }
            if let Some(higher) = joined_strings(fields.get("higher_level")) {
                parts.push(format!("At Higher Levels: {higher}"));
            }
        }
        EntityKind::Monsters => {
            if let Some(kind_name) = fields.get("type").and_then(Value::as_str) {
                parts.push(format!("Type: {kind_name}"));
            }
            if let Some(size) = fields.get("size").and_then(Value::as_str) {
                parts.push(format!("Size: {size}"));
            }
            if let Some(cr) = fields.get("challenge_rating").and_then(Value::as_f64) {
                parts.push(format!("CR: {}", format_challenge_rating(cr)));
            }
            if let Some(hp) = fields.get("hit_points").and_then(Value::as_i64) {
                parts.push(format!("HP: {hp}"));
            }
        }
        EntityKind::Equipment | EntityKind::MagicItems => {
            if let Some(category) = nested_name(fields.get("equipment_category")) {
                parts.push(format!("Category: {category}"));
            }
            if let Some(cost) = fields.get("cost") {
                let quantity = cost.get("quantity").and_then(Value::as_i64).unwrap_or(0);
                let unit = cost.get("unit").and_then(Value::as_str).unwrap_or("gp");
                parts.push(format!("Cost: {quantity} {unit}"));
            }
            if let Some(desc) = description_text(fields) {
                parts.push(desc);
            }
        }
        EntityKind::Classes => {
            if let Some(hit_die) = fields.get("hit_die").and_then(Value::as_i64) {
                parts.push(format!("Hit Die: d{hit_die}"));
            }
        }
        EntityKind::Features => {
            if let Some(level) = fields.get("level").and_then(Value::as_i64) {
                parts.push(format!("Level: {level}"));
            }
            if let Some(desc) = description_text(fields) {
                parts.push(desc);
            }
        }
        _ => {
            if let Some(desc) = description_text(fields) {
                parts.push(desc);
            }
        }
    }

    parts.join(" ")
}

fn nested_name(value: Option<&Value>) -> Option<&str> {
    value?.get("name")?.as_str()
}

fn joined_strings(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn description_text(fields: &Map<String, Value>) -> Option<String> {
    joined_strings(fields.get("desc")).map(|desc| truncate_chars(&desc, 500))
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

fn format_challenge_rating(cr: f64) -> String {
    if cr.fract() == 0.0 {
        format!("{}", cr as i64)
    } else {
        format!("{cr}")
    }
}
