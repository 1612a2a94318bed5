//! Schema and content verification job

use std::collections::BTreeMap;

use tracing::info;

use gm_knowledge_core::{ContentPack, EntityKind, Error, Result};

use crate::ContentStore;

/// Report produced by one verification run
#[derive(Debug, Default, Clone)]
pub struct VerifyReport {
    pub missing_tables: Vec<String>,
    /// Row count per kind table
    pub counts: BTreeMap<String, usize>,
    /// Rows with a non-null embedding per kind table
    pub embedded_counts: BTreeMap<String, usize>,
    pub packs: Vec<ContentPack>,
}

impl VerifyReport {
    /// Schema intact and at least one content pack present
    pub fn is_ok(&self) -> bool {
        self.missing_tables.is_empty() && !self.packs.is_empty()
    }

    pub fn total_rows(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Check the schema and count content per table
pub async fn run(store: &ContentStore) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let conn = store.acquire().await?;

    let mut expected: Vec<&str> = vec!["content_packs", "migration_history"];
    expected.extend(EntityKind::ALL.iter().map(|k| k.table_name()));

    for table in expected {
        let mut result = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                libsql::params![table],
            )
            .await
            .map_err(|e| Error::database("verify schema", e))?;
        if result
            .next()
            .await
            .map_err(|e| Error::database("verify schema", e))?
            .is_none()
        {
            report.missing_tables.push(table.to_string());
        }
    }

    for kind in EntityKind::ALL {
        if report
            .missing_tables
            .iter()
            .any(|t| t == kind.table_name())
        {
            continue;
        }
        let count_sql = format!("SELECT COUNT(*) FROM {}", kind.table_name());
        let embedded_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE embedding IS NOT NULL",
            kind.table_name()
        );
        report
            .counts
            .insert(kind.table_name().to_string(), count(&conn, &count_sql).await?);
        report.embedded_counts.insert(
            kind.table_name().to_string(),
            count(&conn, &embedded_sql).await?,
        );
    }
    store.release(conn);

    report.packs = store.list_content_packs().await?;

    info!(
        tables_missing = report.missing_tables.len(),
        total_rows = report.total_rows(),
        packs = report.packs.len(),
        "verification complete"
    );
    Ok(report)
}

async fn count(conn: &libsql::Connection, sql: &str) -> Result<usize> {
    let mut result = conn
        .query(sql, ())
        .await
        .map_err(|e| Error::database("verify count", e))?;
    match result
        .next()
        .await
        .map_err(|e| Error::database("verify count", e))?
    {
        Some(row) => {
            let n: i64 = row.get(0).map_err(|e| Error::database("verify count", e))?;
            Ok(n.max(0) as usize)
        }
        None => Ok(0),
    }
}
