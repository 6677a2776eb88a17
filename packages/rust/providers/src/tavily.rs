//! Tavily web search adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use lyricsmith_shared::{LyricsmithError, Result, SearchConfig};

use crate::http::{build_client, check_status, endpoint, transport_error};
use crate::{SearchDepth, SearchHit, WebSearch};

/// Client for the Tavily `/search` endpoint.
pub struct TavilySearch {
    client: Client,
    url: Url,
    api_key: String,
    timeout_secs: u64,
}

impl TavilySearch {
    /// Build a client from the `[search]` section, reading the key from its env var.
    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LyricsmithError::config(format!(
                "search API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &SearchConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: endpoint(&config.base_url, "search")?,
            api_key: api_key.into(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    #[instrument(skip_all, fields(?depth, max_results))]
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Vec<SearchHit>> {
        let body = SearchRequest {
            query,
            search_depth: depth,
            max_results,
            include_raw_content: depth == SearchDepth::Advanced,
        };

        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("web search", self.timeout_secs, e))?;

        let response = check_status("web search", response).await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| LyricsmithError::Provider(format!("invalid search body: {e}")))?;

        debug!(results = parsed.results.len(), "search results received");

        Ok(parsed
            .results
            .into_iter()
            .map(|r| SearchHit {
                text: r.content.unwrap_or_default(),
                raw_text: r.raw_content,
                url: r.url.unwrap_or_default(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    search_depth: SearchDepth,
    max_results: u32,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    raw_content: Option<String>,
}
