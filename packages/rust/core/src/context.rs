//! Explicit dependencies handed to every stage.
//!
//! Stages never reach for process-wide clients: they receive a
//! [`StageContext`] holding the injected [`Capabilities`] and the run-wide
//! [`WorkflowConfig`]. Every adapter call goes through a helper here that
//! bounds it with the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lyricsmith_providers::{
    Completion, CompletionOptions, Encyclopedia, EncyclopediaPage, SearchDepth, SearchHit,
    TextCompletion, WebSearch,
};
use lyricsmith_shared::{LyricsmithError, Result};
use lyricsmith_storage::{NoCache, SearchCache};

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// The external collaborators a run depends on.
#[derive(Clone)]
pub struct Capabilities {
    /// Identification, extraction, interspersion and language detection.
    pub analyst: Arc<dyn TextCompletion>,
    /// Lyric translation, fact extraction and fact translation.
    pub translator: Arc<dyn TextCompletion>,
    pub search: Arc<dyn WebSearch>,
    pub encyclopedia: Arc<dyn Encyclopedia>,
    pub cache: Arc<dyn SearchCache>,
}

impl Capabilities {
    /// Capabilities with caching disabled.
    pub fn new(
        analyst: Arc<dyn TextCompletion>,
        translator: Arc<dyn TextCompletion>,
        search: Arc<dyn WebSearch>,
        encyclopedia: Arc<dyn Encyclopedia>,
    ) -> Self {
        Self {
            analyst,
            translator,
            search,
            encyclopedia,
            cache: Arc::new(NoCache),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SearchCache>) -> Self {
        self.cache = cache;
        self
    }
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

/// Run-wide knobs for the workflow engine.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Upper bound for any single adapter call.
    pub call_timeout: Duration,
    /// Lifetime of search results written to the cache.
    pub cache_ttl: Duration,
    /// Ranked results requested from the lyrics search.
    pub search_max_results: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(120),
            cache_ttl: Duration::from_secs(3600),
            search_max_results: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// StageContext
// ---------------------------------------------------------------------------

/// Which completion model a call goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Analyst,
    Translator,
}

/// Borrowed view of the dependencies for one stage invocation.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub caps: &'a Capabilities,
    pub config: &'a WorkflowConfig,
}

impl<'a> StageContext<'a> {
    pub fn new(caps: &'a Capabilities, config: &'a WorkflowConfig) -> Self {
        Self { caps, config }
    }

    /// Run `call` under the configured time bound.
    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LyricsmithError::Timeout {
                operation: operation.to_string(),
                after_secs: self.config.call_timeout.as_secs(),
            }),
        }
    }

    pub async fn complete(
        &self,
        model: Model,
        system_instruction: &str,
        user_content: &str,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let client = match model {
            Model::Analyst => &self.caps.analyst,
            Model::Translator => &self.caps.translator,
        };
        self.bounded(
            "chat completion",
            client.complete(system_instruction, user_content, options),
        )
        .await
    }

    pub async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Vec<SearchHit>> {
        self.bounded(
            "web search",
            self.caps.search.search(query, depth, max_results),
        )
        .await
    }

    pub async fn lookup(&self, title: &str) -> Result<EncyclopediaPage> {
        self.bounded("encyclopedia lookup", self.caps.encyclopedia.lookup(title))
            .await
    }

    /// Cache read; a slow cache counts as a miss.
    pub async fn cached_search(&self, query: &str) -> Option<Vec<String>> {
        tokio::time::timeout(self.config.call_timeout, self.caps.cache.get(query))
            .await
            .ok()
            .flatten()
    }

    /// Cache write; a slow cache drops the entry.
    pub async fn cache_search(&self, query: &str, snippets: &[String]) {
        let put = self.caps.cache.put(query, snippets, self.config.cache_ttl);
        if tokio::time::timeout(self.config.call_timeout, put).await.is_err() {
            tracing::warn!("search cache write timed out");
        }
    }
}
