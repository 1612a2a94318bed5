//! Embedding indexing job
//!
//! Walks the retrieval-enabled kinds, renders each row's textual view,
//! embeds in batches, and writes the vectors back. Rows that already carry
//! a vector of the configured dimension are skipped unless `force` is set,
//! so the job is idempotent and resumable after interruption.

use tracing::{info, warn};

use gm_knowledge_core::config::EmbeddingConfig;
use gm_knowledge_core::embeddings::{utils, SharedEmbedder};
use gm_knowledge_core::{EntityKind, Error, Result};

use crate::fields::field_map;
use crate::search::content_text;
use crate::{rows, ContentStore};

/// Outcome of one indexing run
#[derive(Debug, Default, Clone)]
pub struct IndexSummary {
    pub tables_processed: usize,
    pub rows_embedded: usize,
    pub rows_skipped: usize,
}

struct PendingRow {
    index: String,
    pack_id: String,
    text: String,
}

/// Generate embeddings for every retrieval-enabled kind
pub async fn run(
    store: &ContentStore,
    embedder: &SharedEmbedder,
    config: &EmbeddingConfig,
    force: bool,
) -> Result<IndexSummary> {
    let mut summary = IndexSummary::default();
    let expected_bytes = (config.dimension * 4) as i64;

    for kind in EntityKind::RAG_INDEXED {
        let (pending, skipped) = collect_pending(store, kind, expected_bytes, force).await?;
        summary.rows_skipped += skipped;
        summary.tables_processed += 1;

        if pending.is_empty() {
            info!(table = kind.table_name(), skipped, "nothing to embed");
            continue;
        }

        info!(
            table = kind.table_name(),
            rows = pending.len(),
            "embedding rows"
        );

        for batch in pending.chunks(config.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|row| row.text.clone()).collect();
            let vectors = embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| Error::database("embed batch", e))?;

            let conn = store.acquire().await?;
            for (row, vector) in batch.iter().zip(vectors) {
                utils::validate_dimension(&vector, config.dimension)
                    .map_err(|e| Error::InvalidArgument(e.to_string()))?;
                conn.execute(
                    &format!(
                        "UPDATE {table} SET embedding = ? WHERE \"index\" = ? AND content_pack_id = ?",
                        table = kind.table_name()
                    ),
                    libsql::params![
                        rows::vec_to_blob(&vector),
                        row.index.as_str(),
                        row.pack_id.as_str(),
                    ],
                )
                .await
                .map_err(|e| Error::database("write embedding", e))?;
                summary.rows_embedded += 1;
            }
            store.release(conn);
        }
    }

    info!(
        embedded = summary.rows_embedded,
        skipped = summary.rows_skipped,
        "indexing complete"
    );
    Ok(summary)
}

async fn collect_pending(
    store: &ContentStore,
    kind: EntityKind,
    expected_bytes: i64,
    force: bool,
) -> Result<(Vec<PendingRow>, usize)> {
    let fields = field_map(kind);
    let sql = format!(
        "SELECT t.*, length(t.embedding) AS embedding_bytes FROM {table} t",
        table = kind.table_name()
    );

    let conn = store.acquire().await?;
    let mut result = conn
        .query(&sql, ())
        .await
        .map_err(|e| Error::database("scan for indexing", e))?;
    let names = rows::column_names(&result);

    let mut pending = Vec::new();
    let mut skipped = 0usize;

    while let Some(row) = result
        .next()
        .await
        .map_err(|e| Error::database("scan for indexing", e))?
    {
        let mut map = rows::row_to_json_map(&row, &names, &fields)?;
        let bytes = map
            .remove("embedding_bytes")
            .and_then(|v| v.as_i64());

        if !force && bytes == Some(expected_bytes) {
            skipped += 1;
            continue;
        }

        let Some(index) = map.get("index").and_then(|v| v.as_str()).map(String::from) else {
            warn!(table = kind.table_name(), "row without index, skipping");
            continue;
        };
        let Some(pack_id) = map
            .get("content_pack_id")
            .and_then(|v| v.as_str())
            .map(String::from)
        else {
            warn!(table = kind.table_name(), index, "row without pack id, skipping");
            continue;
        };

        let text = content_text(kind, &map);
        if text.trim().is_empty() {
            skipped += 1;
            continue;
        }
        pending.push(PendingRow {
            index,
            pack_id,
            text,
        });
    }
    store.release(conn);

    Ok((pending, skipped))
}
