//! Shared types, error model, and configuration for lyricsmith.
//!
//! This crate is the foundation depended on by all other lyricsmith crates.
//! It provides:
//! - [`LyricsmithError`]: the unified error type
//! - The run record model ([`RunRequest`], [`RunRecord`], [`RunDelta`], [`Stage`])
//! - Configuration ([`AppConfig`], config loading, API key validation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, CompletionConfig, EncyclopediaConfig, SearchConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, validate_api_keys,
};
pub use error::{LyricsmithError, Result};
pub use types::{
    ErrorKind, RunDelta, RunError, RunId, RunOutcome, RunRecord, RunRequest, Stage,
};
