//! External capability contracts and their HTTP adapters.
//!
//! The pipeline depends only on the three traits defined here:
//! - [`TextCompletion`]: "complete text given a prompt"
//! - [`WebSearch`]: "search the web"
//! - [`Encyclopedia`]: "look up an encyclopedia page"
//!
//! Concrete adapters: [`ChatCompletionClient`] (any OpenAI-compatible chat
//! endpoint), [`TavilySearch`], and [`WikipediaClient`].

mod http;
pub mod openai;
pub mod tavily;
pub mod wikipedia;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lyricsmith_shared::Result;

pub use openai::ChatCompletionClient;
pub use tavily::TavilySearch;
pub use wikipedia::WikipediaClient;

// ---------------------------------------------------------------------------
// Text completion
// ---------------------------------------------------------------------------

/// Sampling options for a single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Overrides the adapter's configured limit when set.
    pub max_tokens: Option<u32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

/// The text produced by a completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    /// The provider stopped because it hit the output limit.
    pub truncated: bool,
    /// The provider withheld part of the output on policy grounds.
    pub filtered: bool,
}

impl Completion {
    /// A complete, untruncated response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// "Complete text given a prompt."
///
/// Fails with a provider error on transport failure, timeout, or an empty
/// response.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

// ---------------------------------------------------------------------------
// Web search
// ---------------------------------------------------------------------------

/// How hard the search provider should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Short snippet.
    pub text: String,
    /// Full page text, when the provider returned it.
    pub raw_text: Option<String>,
    pub url: String,
}

impl SearchHit {
    /// Full page text when present and non-empty, otherwise the snippet;
    /// `None` if both are empty.
    pub fn best_text(&self) -> Option<&str> {
        self.raw_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| Some(self.text.as_str()).filter(|t| !t.trim().is_empty()))
    }
}

/// "Search the web."
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Encyclopedia
// ---------------------------------------------------------------------------

/// A resolved encyclopedia article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncyclopediaPage {
    pub title: String,
    pub content: String,
}

/// "Look up an encyclopedia page."
///
/// Fails with [`lyricsmith_shared::LyricsmithError::NotFound`] when nothing
/// matches or the title is ambiguous.
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn lookup(&self, title: &str) -> Result<EncyclopediaPage>;
}
