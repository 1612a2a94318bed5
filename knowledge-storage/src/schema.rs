//! Database schema definitions for the content store
//!
//! The catalog tables share a common shape (`"index"`, `name`, `url`,
//! `content_pack_id`, `embedding`) plus kind-specific columns taken from
//! [`EntityKind::extra_columns_ddl`]. `"index"` and `"desc"` are quoted
//! everywhere because both are SQL keywords.

use gm_knowledge_core::EntityKind;

/// SQL to create the content packs table
pub const CREATE_CONTENT_PACKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS content_packs (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    version TEXT NOT NULL,
    author TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the migration history table
pub const CREATE_MIGRATION_HISTORY_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migration_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    migration_id TEXT NOT NULL UNIQUE,
    content_pack_id TEXT NOT NULL,
    file_name TEXT NOT NULL,
    items_count INTEGER NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    error_message TEXT
)
"#;

/// DDL for one catalog kind table. The vector column stores packed
/// little-endian f32, exactly `dimension` elements per row.
pub fn create_kind_table_sql(kind: EntityKind) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {table} (
    "index" TEXT NOT NULL,
    name TEXT NOT NULL,
    url TEXT NOT NULL,
    content_pack_id TEXT NOT NULL REFERENCES content_packs(id),
    embedding BLOB,
    {extra},
    UNIQUE("index", content_pack_id)
)"#,
        table = kind.table_name(),
        extra = kind.extra_columns_ddl()
    )
}

/// Index on the name column for case-insensitive lookups and substring
/// search
pub fn create_name_index_sql(kind: EntityKind) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name COLLATE NOCASE)",
        table = kind.table_name()
    )
}

/// Index on the pack column for priority resolution
pub fn create_pack_index_sql(kind: EntityKind) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_pack ON {table}(content_pack_id)",
        table = kind.table_name()
    )
}
