//! Connection pool for the content store
//!
//! libSQL connections are cheap but not free; repository calls acquire a
//! connection per operation, so idle connections are kept around up to the
//! configured size. Pooled connections are pinged before reuse and recycled
//! after the configured age. A connection dropped on an error path simply
//! closes; the pool refills on demand.

use std::sync::Arc;
use std::time::{Duration, Instant};

use libsql::{Connection, Database};
use parking_lot::Mutex;
use tracing::debug;

use gm_knowledge_core::{Error, Result};

struct PooledConnection {
    conn: Connection,
    created_at: Instant,
}

pub struct ConnectionPool {
    db: Arc<Database>,
    idle: Mutex<Vec<PooledConnection>>,
    max_size: usize,
    recycle_after: Duration,
    /// Per-connection pragmas (busy timeout, synchronous mode) applied to
    /// every freshly opened connection
    pragmas: Vec<String>,
}

impl ConnectionPool {
    pub fn new(
        db: Arc<Database>,
        max_size: usize,
        recycle_after: Duration,
        pragmas: Vec<String>,
    ) -> Self {
        Self {
            db,
            idle: Mutex::new(Vec::new()),
            max_size: max_size.max(1),
            recycle_after,
            pragmas,
        }
    }

    /// Take a validated connection from the pool, or open a new one
    pub async fn acquire(&self) -> Result<Connection> {
        loop {
            let candidate = self.idle.lock().pop();
            let Some(pooled) = candidate else { break };

            if pooled.created_at.elapsed() > self.recycle_after {
                debug!("recycling aged pooled connection");
                continue;
            }
            // Pre-ping before handing out
            if pooled.conn.query("SELECT 1", ()).await.is_ok() {
                return Ok(pooled.conn);
            }
            debug!("discarding dead pooled connection");
        }

        let conn = self
            .db
            .connect()
            .map_err(|e| Error::Connection(format!("failed to open connection: {e}")))?;
        for pragma in &self.pragmas {
            conn.query(pragma, ())
                .await
                .map_err(|e| Error::Connection(format!("failed to apply {pragma}: {e}")))?;
        }
        Ok(conn)
    }

    /// Return a connection for reuse; dropped silently when the pool is full
    pub fn release(&self, conn: Connection) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_size {
            idle.push(PooledConnection {
                conn,
                created_at: Instant::now(),
            });
        }
    }

    /// Number of idle connections currently held
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}
