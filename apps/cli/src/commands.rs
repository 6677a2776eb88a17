//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use lyricsmith_core::{Capabilities, ProgressReporter, SilentProgress, Workflow, WorkflowConfig};
use lyricsmith_providers::{ChatCompletionClient, TavilySearch, WikipediaClient};
use lyricsmith_shared::{
    AppConfig, CacheConfig, RunRecord, RunRequest, Stage, expand_home, init_config, load_config,
    validate_api_keys,
};
use lyricsmith_storage::{NoCache, SearchCache, Storage};
use tracing::{debug, info, warn};

use crate::display;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lyricsmith: lyrics, translations and curious facts for any song.
#[derive(Parser)]
#[command(
    name = "lyricsmith",
    version,
    about = "Find song lyrics, an interleaved translation, and curious facts from a free-text request.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Find the lyrics for a song.
    Find {
        /// Song title or a description of the song.
        query: String,

        /// Target language for an interleaved translation.
        #[arg(short = 't', long = "translate")]
        translate: Option<String>,

        /// Print the full run record as JSON.
        #[arg(long)]
        json: bool,

        /// Skip the search result cache for this run.
        #[arg(long)]
        no_cache: bool,

        /// Override the cache TTL in seconds.
        #[arg(long)]
        cache_ttl: Option<u64>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Search result cache maintenance.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Remove expired entries.
    Prune,
    /// Remove every entry.
    Clear,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "lyricsmith=info",
        1 => "lyricsmith=debug",
        _ => "lyricsmith=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Find {
            query,
            translate,
            json,
            no_cache,
            cache_ttl,
        } => cmd_find(&query, translate, json, no_cache, cache_ttl).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
        Command::Cache { action } => match action {
            CacheAction::Prune => cmd_cache_prune().await,
            CacheAction::Clear => cmd_cache_clear().await,
        },
    }
}

// ---------------------------------------------------------------------------
// find
// ---------------------------------------------------------------------------

async fn cmd_find(
    query: &str,
    translate: Option<String>,
    json: bool,
    no_cache: bool,
    cache_ttl: Option<u64>,
) -> Result<()> {
    // Validate API keys before doing anything
    let config = load_config()?;
    validate_api_keys(&config)?;

    let cache = open_cache(&config.cache, no_cache).await;
    let caps = Capabilities::new(
        Arc::new(ChatCompletionClient::from_config(&config.completion)?),
        Arc::new(ChatCompletionClient::from_config(&config.translation)?),
        Arc::new(TavilySearch::from_config(&config.search)?),
        Arc::new(WikipediaClient::new(&config.encyclopedia)?),
    )
    .with_cache(cache);

    let workflow = Workflow::new(caps, workflow_config(&config, cache_ttl));

    info!(
        query,
        target_language = translate.as_deref().unwrap_or(""),
        "finding lyrics"
    );

    let request = RunRequest::new(query, translate);
    let record = if json {
        workflow.run_with_progress(request, &SilentProgress).await?
    } else {
        let reporter = CliProgress::new();
        workflow.run_with_progress(request, &reporter).await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", display::render(&record));
    }

    Ok(())
}

/// Engine settings derived from config. The per-call bound sits above every
/// adapter's own HTTP timeout.
fn workflow_config(config: &AppConfig, cache_ttl: Option<u64>) -> WorkflowConfig {
    let slowest = config
        .completion
        .timeout_secs
        .max(config.translation.timeout_secs)
        .max(config.search.timeout_secs)
        .max(config.encyclopedia.timeout_secs);

    WorkflowConfig {
        call_timeout: Duration::from_secs(slowest + 5),
        cache_ttl: Duration::from_secs(cache_ttl.unwrap_or(config.cache.ttl_secs)),
        search_max_results: config.search.max_results,
    }
}

/// The configured cache, or [`NoCache`] when disabled or unavailable.
async fn open_cache(config: &CacheConfig, no_cache: bool) -> Arc<dyn SearchCache> {
    if no_cache || !config.enabled {
        debug!("search cache disabled");
        return Arc::new(NoCache);
    }

    let path = match expand_home(&config.path) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "cannot resolve cache path, continuing without cache");
            return Arc::new(NoCache);
        }
    };

    match Storage::open(&path).await {
        Ok(storage) => {
            debug!(path = %path.display(), "search cache opened");
            Arc::new(storage)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open cache, continuing without it");
            Arc::new(NoCache)
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage) {
        let mut phase = stage.phase().to_string();
        if let Some(first) = phase.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        self.spinner.set_message(format!("{phase}..."));
    }

    fn stage_finished(&self, _stage: Stage, record: &RunRecord) {
        if let Some(error) = &record.error {
            self.spinner
                .set_message(format!("Stopped during {}", error.stage.phase()));
        }
    }

    fn done(&self, _record: &RunRecord) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config / cache
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn open_storage() -> Result<Storage> {
    let config = load_config()?;
    let path = expand_home(&config.cache.path)?;
    if !path.exists() {
        return Err(eyre!("no cache database at '{}'", path.display()));
    }
    Ok(Storage::open(&path).await?)
}

async fn cmd_cache_prune() -> Result<()> {
    let storage = open_storage().await?;
    let removed = storage.prune_expired_search_cache().await?;
    let remaining = storage.search_cache_len().await?;
    info!(removed, remaining, "cache pruned");
    println!("Removed {removed} expired entries ({remaining} remaining).");
    Ok(())
}

async fn cmd_cache_clear() -> Result<()> {
    let storage = open_storage().await?;
    let removed = storage.clear_search_cache().await?;
    info!(removed, "cache cleared");
    println!("Removed {removed} entries.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_parses_all_flags() {
        let cli = Cli::try_parse_from([
            "lyricsmith",
            "-vv",
            "find",
            "Bella Ciao",
            "-t",
            "French",
            "--json",
            "--no-cache",
            "--cache-ttl",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Find {
                query,
                translate,
                json,
                no_cache,
                cache_ttl,
            } => {
                assert_eq!(query, "Bella Ciao");
                assert_eq!(translate.as_deref(), Some("French"));
                assert!(json);
                assert!(no_cache);
                assert_eq!(cache_ttl, Some(60));
            }
            _ => panic!("expected find"),
        }
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["lyricsmith", "cache", "prune", "--log-format", "json"])
            .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Cache {
                action: CacheAction::Prune
            }
        ));
    }

    #[test]
    fn find_requires_a_query() {
        assert!(Cli::try_parse_from(["lyricsmith", "find"]).is_err());
    }

    #[test]
    fn workflow_config_follows_config_and_flags() {
        let mut config = AppConfig::default();
        config.search.timeout_secs = 90;
        config.search.max_results = 7;

        let wf = workflow_config(&config, None);
        assert_eq!(wf.call_timeout, Duration::from_secs(95));
        assert_eq!(wf.cache_ttl, Duration::from_secs(config.cache.ttl_secs));
        assert_eq!(wf.search_max_results, 7);

        let wf = workflow_config(&config, Some(10));
        assert_eq!(wf.cache_ttl, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn disabled_cache_is_a_no_op() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = open_cache(&config, false).await;
        cache.put("q", &["x".to_string()], Duration::from_secs(60)).await;
        assert!(cache.get("q").await.is_none());
    }
}
