//! libSQL storage layer and the search result cache.
//!
//! The [`Storage`] struct wraps a local libSQL database holding cached web
//! search results with an expiry. The [`SearchCache`] trait is the contract
//! the pipeline consumes; [`Storage`], [`MemoryCache`] and [`NoCache`]
//! implement it.
//!
//! **Access rules:**
//! - CLI `find`: read-write via [`Storage::open`]
//! - Inspection tooling: read-only via [`Storage::open_readonly`]

mod cache;
mod migrations;

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use libsql::{Connection, Database, params};
use lyricsmith_shared::{LyricsmithError, Result};

pub use cache::{MemoryCache, NoCache, SearchCache, cache_key, normalize_query};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LyricsmithError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LyricsmithError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LyricsmithError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Search cache operations
    // -----------------------------------------------------------------------

    /// Get unexpired cached snippets for a cache key.
    pub async fn get_search_cache(&self, key: &str) -> Result<Option<Vec<String>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT snippets_json, expires_at_ms FROM search_cache WHERE cache_key = ?1",
                params![key],
            )
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(None),
            Err(e) => return Err(LyricsmithError::Storage(e.to_string())),
        };

        let expires_at_ms: i64 = row
            .get(1)
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;
        if expires_at_ms <= Utc::now().timestamp_millis() {
            return Ok(None);
        }

        let json: String = row
            .get(0)
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;
        let snippets = serde_json::from_str(&json)
            .map_err(|e| LyricsmithError::Storage(format!("corrupt cache entry: {e}")))?;
        Ok(Some(snippets))
    }

    /// Store snippets under a cache key (upserts; last writer wins).
    pub async fn set_search_cache(
        &self,
        key: &str,
        query: &str,
        snippets: &[String],
        ttl: Duration,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now.timestamp_millis().saturating_add(ttl_ms);
        let json = serde_json::to_string(snippets)
            .map_err(|e| LyricsmithError::Storage(format!("failed to encode snippets: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO search_cache (cache_key, query, snippets_json, created_at, expires_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cache_key) DO UPDATE SET
                   query = excluded.query,
                   snippets_json = excluded.snippets_json,
                   created_at = excluded.created_at,
                   expires_at_ms = excluded.expires_at_ms",
                params![key, query, json.as_str(), now.to_rfc3339(), expires_at_ms],
            )
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Delete expired entries. Returns the number of rows removed.
    pub async fn prune_expired_search_cache(&self) -> Result<u64> {
        self.check_writable()?;
        let now_ms = Utc::now().timestamp_millis();
        self.conn
            .execute(
                "DELETE FROM search_cache WHERE expires_at_ms <= ?1",
                params![now_ms],
            )
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))
    }

    /// Delete every entry. Returns the number of rows removed.
    pub async fn clear_search_cache(&self) -> Result<u64> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM search_cache", params![])
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))
    }

    /// Count stored entries, expired or not.
    pub async fn search_cache_len(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM search_cache", params![])
            .await
            .map_err(|e| LyricsmithError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| LyricsmithError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(LyricsmithError::Storage(e.to_string())),
        }
    }
}
