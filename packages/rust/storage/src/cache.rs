//! Search result cache contract and implementations.
//!
//! Every implementation swallows its own failures: a broken cache behaves
//! as an always-miss cache and never affects a run's outcome.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::Storage;

/// Collapse whitespace runs, trim, and lowercase a query.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable cache key for a query: `search:<sha256 of the normalized query>`.
pub fn cache_key(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_query(query).as_bytes());
    format!("search:{:x}", hasher.finalize())
}

/// Best-effort store of web search snippets keyed by query.
#[async_trait]
pub trait SearchCache: Send + Sync {
    /// Cached snippets for `query`, or `None` on a miss, an expired entry,
    /// or any internal failure.
    async fn get(&self, query: &str) -> Option<Vec<String>>;

    /// Store `snippets` for `query` for `ttl`. Failures are logged and dropped.
    async fn put(&self, query: &str, snippets: &[String], ttl: Duration);
}

// ---------------------------------------------------------------------------
// NoCache
// ---------------------------------------------------------------------------

/// A cache that never hits. Used when caching is disabled or unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl SearchCache for NoCache {
    async fn get(&self, _query: &str) -> Option<Vec<String>> {
        None
    }

    async fn put(&self, _query: &str, _snippets: &[String], _ttl: Duration) {}
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

struct MemoryEntry {
    snippets: Vec<String>,
    expires_at: Instant,
}

/// In-process cache shared by concurrent runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet overwritten.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SearchCache for MemoryCache {
    async fn get(&self, query: &str) -> Option<Vec<String>> {
        let key = cache_key(query);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if Instant::now() >= entry.expires_at {
            debug!(%key, "memory cache entry expired");
            return None;
        }
        Some(entry.snippets.clone())
    }

    async fn put(&self, query: &str, snippets: &[String], ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            warn!(?ttl, "cache TTL out of range, entry not stored");
            return;
        };
        let entry = MemoryEntry {
            snippets: snippets.to_vec(),
            expires_at,
        };
        self.entries.write().await.insert(cache_key(query), entry);
    }
}

// ---------------------------------------------------------------------------
// Storage-backed cache
// ---------------------------------------------------------------------------

#[async_trait]
impl SearchCache for Storage {
    async fn get(&self, query: &str) -> Option<Vec<String>> {
        match self.get_search_cache(&cache_key(query)).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "search cache read failed, treating as miss");
                None
            }
        }
    }

    async fn put(&self, query: &str, snippets: &[String], ttl: Duration) {
        if let Err(e) = self
            .set_search_cache(&cache_key(query), query, snippets, ttl)
            .await
        {
            warn!(error = %e, "search cache write failed");
        }
    }
}
