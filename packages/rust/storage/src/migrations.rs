//! SQL migration definitions for the lyricsmith cache database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: search_cache",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Web search results keyed by hashed, normalized query
CREATE TABLE IF NOT EXISTS search_cache (
    cache_key     TEXT PRIMARY KEY,
    query         TEXT NOT NULL,
    snippets_json TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    expires_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_cache_expiry ON search_cache(expires_at_ms);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
