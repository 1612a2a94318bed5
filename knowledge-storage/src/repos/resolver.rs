//! Reference resolver
//!
//! Follows `{index, name, url}` triples to their target entities. Targets
//! are returned as raw JSON so the resolver works uniformly across all 25
//! kinds. Cycles (class ↔ subclass ↔ feature) are caught by a visited set
//! keyed by URL; resolution fails fast with a typed error at the maximum
//! depth.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use gm_knowledge_core::constants::defaults::MAX_REFERENCE_DEPTH;
use gm_knowledge_core::{EntityKind, Error, ResourceRef, Result};

use crate::fields::field_map;
use crate::rows;
use crate::ContentStore;

pub struct ReferenceResolver {
    store: Arc<ContentStore>,
}

impl ReferenceResolver {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Resolve a single reference to its entity JSON, searching priority
    /// packs first when given, else active packs
    pub async fn resolve(
        &self,
        reference: &ResourceRef,
        packs: Option<&[String]>,
    ) -> Result<Value> {
        let (kind, index) = parse_reference_url(&reference.url)?;
        self.load_entity(kind, &index, packs).await
    }

    /// Resolve a reference and, recursively, every reference triple inside
    /// it, bounded by the maximum depth
    pub async fn resolve_tree(
        &self,
        reference: &ResourceRef,
        packs: Option<&[String]>,
    ) -> Result<Value> {
        let mut visited = HashSet::new();
        self.resolve_ref(reference.url.clone(), packs, &mut visited, 0)
            .await
    }

    fn resolve_ref<'a>(
        &'a self,
        url: String,
        packs: Option<&'a [String]>,
        visited: &'a mut HashSet<String>,
        depth: usize,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            if depth >= MAX_REFERENCE_DEPTH {
                return Err(Error::CircularReference { url, depth });
            }
            if !visited.insert(url.clone()) {
                return Err(Error::CircularReference { url, depth });
            }

            let (kind, index) = parse_reference_url(&url)?;
            let entity = self.load_entity(kind, &index, packs).await?;
            let resolved = self
                .resolve_nested(entity, packs, visited, depth + 1)
                .await?;

            // Backtrack so diamond-shaped reference graphs resolve; only
            // true cycles stay on the path
            visited.remove(&url);
            Ok(resolved)
        }
        .boxed()
    }

    fn resolve_nested<'a>(
        &'a self,
        value: Value,
        packs: Option<&'a [String]>,
        visited: &'a mut HashSet<String>,
        depth: usize,
    ) -> BoxFuture<'a, Result<Value>> {
        async move {
            match value {
                Value::Object(map) => {
                    if let Some(url) = as_reference_triple(&map) {
                        return self.resolve_ref(url, packs, visited, depth).await;
                    }
                    let mut resolved = Map::with_capacity(map.len());
                    for (key, nested) in map {
                        let nested = self.resolve_nested(nested, packs, visited, depth).await?;
                        resolved.insert(key, nested);
                    }
                    Ok(Value::Object(resolved))
                }
                Value::Array(items) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve_nested(item, packs, visited, depth).await?);
                    }
                    Ok(Value::Array(resolved))
                }
                other => Ok(other),
            }
        }
        .boxed()
    }

    async fn load_entity(
        &self,
        kind: EntityKind,
        index: &str,
        packs: Option<&[String]>,
    ) -> Result<Value> {
        let fields = field_map(kind);
        let conn = self.store.acquire().await?;

        let found = if let Some(priority) = packs {
            let sql = format!(
                "SELECT t.* FROM {} t WHERE t.\"index\" = ? AND t.content_pack_id = ? LIMIT 1",
                kind.table_name()
            );
            let mut found = None;
            for pack_id in priority {
                let mut result = conn
                    .query(&sql, libsql::params![index, pack_id.as_str()])
                    .await
                    .map_err(|e| Error::database("resolve reference", e))?;
                let names = rows::column_names(&result);
                if let Some(row) = result
                    .next()
                    .await
                    .map_err(|e| Error::database("resolve reference", e))?
                {
                    found = Some(rows::row_to_json_map(&row, &names, &fields)?);
                    break;
                }
            }
            found
        } else {
            let sql = format!(
                "SELECT t.* FROM {} t JOIN content_packs p ON t.content_pack_id = p.id \
                 WHERE t.\"index\" = ? AND p.is_active = 1 ORDER BY t.content_pack_id LIMIT 1",
                kind.table_name()
            );
            let mut result = conn
                .query(&sql, libsql::params![index])
                .await
                .map_err(|e| Error::database("resolve reference", e))?;
            let names = rows::column_names(&result);
            match result
                .next()
                .await
                .map_err(|e| Error::database("resolve reference", e))?
            {
                Some(row) => Some(rows::row_to_json_map(&row, &names, &fields)?),
                None => None,
            }
        };
        self.store.release(conn);

        match found {
            Some(mut map) => {
                map.remove("content_pack_id");
                Ok(Value::Object(map))
            }
            None => Err(Error::ReferenceNotFound(format!(
                "{}/{index}",
                kind.table_name()
            ))),
        }
    }
}

/// A JSON object is treated as a reference triple only when it is exactly
/// `{index, name, url}` with string values
fn as_reference_triple(map: &Map<String, Value>) -> Option<String> {
    if map.len() != 3 {
        return None;
    }
    map.get("index")?.as_str()?;
    map.get("name")?.as_str()?;
    Some(map.get("url")?.as_str()?.to_string())
}

/// Split an API url like `/api/rule-sections/cover` into its kind and
/// index. The path segment is validated against the table whitelist.
fn parse_reference_url(url: &str) -> Result<(EntityKind, String)> {
    let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 3 || segments[0] != "api" {
        return Err(Error::InvalidArgument(format!("malformed reference url: {url}")));
    }
    let table = segments[1].replace('-', "_");
    let kind = EntityKind::from_table_name(&table)
        .ok_or_else(|| Error::InvalidArgument(format!("unknown reference kind: {url}")))?;
    Ok((kind, segments[2].to_string()))
}
