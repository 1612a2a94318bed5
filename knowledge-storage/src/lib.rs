#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # GM Knowledge Storage
//!
//! libSQL-backed content store for the gamemaster knowledge core:
//!
//! - Schema creation and pragma configuration for the 25 catalog tables
//! - Approximate nearest-neighbor search with an in-process linear-scan
//!   fallback when native vector functions are unavailable
//! - Session-isolated repositories returning pure value objects
//! - One-shot migration, indexing, and verification jobs
//!
//! ## Example
//!
//! ```no_run
//! use gm_knowledge_storage::ContentStore;
//! use gm_knowledge_core::config::StoreConfig;
//!
//! # async fn example() -> gm_knowledge_core::Result<()> {
//! let store = ContentStore::open(StoreConfig::default()).await?;
//! store.initialize_schema().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use libsql::{Builder, Connection, Database};
use tracing::{debug, error, info, warn};

use gm_knowledge_core::config::StoreConfig;
use gm_knowledge_core::{ContentPack, EntityKind, Error, Result};

pub mod fields;
pub mod jobs;
pub mod pool;
pub mod repos;
pub mod rows;
pub mod schema;
pub mod search;

pub use fields::{field_map, FieldMap};
pub use pool::ConnectionPool;
pub use repos::{
    ClassRepository, EquipmentRepository, MonsterRepository, ReferenceResolver, Repository,
    RepositoryHub, SpellRepository,
};
pub use search::StoreCatalogSearch;

/// Embedded content store holding the catalog
pub struct ContentStore {
    db: Arc<Database>,
    pool: ConnectionPool,
    config: StoreConfig,
    native_vector: AtomicBool,
    disposed: AtomicBool,
}

impl ContentStore {
    /// Open (or create) the store at the configured URL. A failure here is
    /// fatal for the process: nothing else can run without the catalog.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        info!(url = %config.url, "opening content store");

        let path = config
            .url
            .strip_prefix("file:")
            .unwrap_or(config.url.as_str());
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| Error::Connection(format!("failed to open {}: {e}", config.url)))?;
        let db = Arc::new(db);

        let pragmas = vec![
            format!("PRAGMA busy_timeout={}", config.busy_timeout_ms),
            format!("PRAGMA synchronous={}", config.synchronous),
        ];
        let pool = ConnectionPool::new(
            Arc::clone(&db),
            config.pool_size,
            Duration::from_secs(config.recycle_seconds),
            pragmas,
        );

        let store = Self {
            db,
            pool,
            config,
            native_vector: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        };

        // WAL is a property of the database file; one-time setup
        let conn = store.acquire().await?;
        conn.query("PRAGMA journal_mode=WAL", ())
            .await
            .map_err(|e| Error::Connection(format!("failed to enable WAL: {e}")))?;

        if store.config.vector_extension {
            store.probe_vector_support(&conn).await;
        } else {
            info!("native vector search disabled by configuration");
        }
        store.release(conn);

        Ok(store)
    }

    /// Check once whether the vector distance function is available. When
    /// it is not, every search takes the linear-scan path; results are
    /// identical, latency is higher.
    async fn probe_vector_support(&self, conn: &Connection) {
        let probe = "SELECT vector_distance_l2(vector32('[1,0]'), vector32('[0,1]'))";
        match conn.query(probe, ()).await {
            Ok(_) => {
                info!("native vector search available");
                self.native_vector.store(true, Ordering::Relaxed);
            }
            Err(e) => {
                warn!("native vector search unavailable, using linear scan: {e}");
            }
        }
    }

    /// Whether native nearest-neighbor SQL is usable
    pub fn has_native_vector(&self) -> bool {
        self.native_vector.load(Ordering::Relaxed)
    }

    /// Mark native search broken at runtime so later queries skip it
    pub(crate) fn disable_native_vector(&self) {
        self.native_vector.store(false, Ordering::Relaxed);
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Acquire a pooled connection
    pub async fn acquire(&self) -> Result<Connection> {
        if self.disposed.load(Ordering::Relaxed) {
            return Err(Error::Connection("store is disposed".into()));
        }
        self.pool.acquire().await
    }

    /// Return a connection to the pool
    pub fn release(&self, conn: Connection) {
        self.pool.release(conn);
    }

    /// Create all tables and indexes. Safe to call repeatedly.
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("initializing content store schema");
        let conn = self.acquire().await?;

        self.execute_with_retry(&conn, schema::CREATE_CONTENT_PACKS_TABLE)
            .await?;
        self.execute_with_retry(&conn, schema::CREATE_MIGRATION_HISTORY_TABLE)
            .await?;

        for kind in EntityKind::ALL {
            self.execute_with_retry(&conn, &schema::create_kind_table_sql(kind))
                .await?;
            self.execute_with_retry(&conn, &schema::create_name_index_sql(kind))
                .await?;
            self.execute_with_retry(&conn, &schema::create_pack_index_sql(kind))
                .await?;
        }

        self.release(conn);
        info!("schema initialization complete");
        Ok(())
    }

    /// Execute DDL with exponential-backoff retries; a concurrent indexing
    /// job can hold the write lock briefly
    async fn execute_with_retry(&self, conn: &Connection, sql: &str) -> Result<()> {
        const MAX_ATTEMPTS: u32 = 3;
        let mut delay = Duration::from_millis(100);

        for attempt in 1..=MAX_ATTEMPTS {
            match conn.execute(sql, ()).await {
                Ok(_) => {
                    if attempt > 1 {
                        debug!(attempt, "DDL succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(attempt, "DDL attempt failed: {e}, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    error!("DDL failed after {MAX_ATTEMPTS} attempts: {e}");
                    return Err(Error::database("schema", e));
                }
            }
        }
        unreachable!("retry loop returns on success or final failure")
    }

    /// Verify connectivity
    pub async fn health_check(&self) -> Result<bool> {
        let conn = self.acquire().await?;
        let healthy = conn.query("SELECT 1", ()).await.is_ok();
        if !healthy {
            error!("content store health check failed");
        }
        self.release(conn);
        Ok(healthy)
    }

    /// Insert or update a content pack row
    pub async fn upsert_content_pack(&self, pack: &ContentPack) -> Result<()> {
        let conn = self.acquire().await?;
        conn.execute(
            "INSERT INTO content_packs (id, name, description, version, author, is_active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, description = excluded.description, \
             version = excluded.version, author = excluded.author, is_active = excluded.is_active, \
             updated_at = excluded.updated_at",
            libsql::params![
                pack.id.as_str(),
                pack.name.as_str(),
                pack.description.as_deref(),
                pack.version.as_str(),
                pack.author.as_deref(),
                i64::from(pack.is_active),
                pack.created_at.to_rfc3339(),
                pack.updated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| Error::database("upsert content pack", e))?;
        self.release(conn);
        Ok(())
    }

    /// List every content pack
    pub async fn list_content_packs(&self) -> Result<Vec<ContentPack>> {
        let conn = self.acquire().await?;
        let mut rows = conn
            .query(
                "SELECT id, name, description, version, author, is_active, created_at, updated_at \
                 FROM content_packs ORDER BY id",
                (),
            )
            .await
            .map_err(|e| Error::database("list content packs", e))?;

        let mut packs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::database("list content packs", e))?
        {
            match rows::row_to_content_pack(&row) {
                Ok(pack) => packs.push(pack),
                Err(e) => warn!("skipping invalid content pack row: {e}"),
            }
        }
        self.release(conn);
        Ok(packs)
    }

    /// Close the store. Idempotent; later acquires fail with a connection
    /// error.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::Relaxed) {
            info!("content store disposed");
        }
    }
}
