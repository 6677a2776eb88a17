//! In-memory fakes of the capability traits for stage and engine tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lyricsmith_providers::{
    Completion, CompletionOptions, Encyclopedia, EncyclopediaPage, SearchDepth, SearchHit,
    TextCompletion, WebSearch,
};
use lyricsmith_shared::{LyricsmithError, Result};
use lyricsmith_storage::SearchCache;

use crate::context::Capabilities;

/// A scripted completion reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(Completion),
    Empty,
    Fail(String),
    Hang,
}

impl Reply {
    pub fn text(text: &str) -> Self {
        Self::Text(Completion::text(text))
    }

    pub fn truncated(text: &str) -> Self {
        Self::Text(Completion {
            text: text.to_string(),
            truncated: true,
            filtered: false,
        })
    }
}

/// One recorded completion call.
#[derive(Debug, Clone)]
pub struct CompletionCall {
    pub system: String,
    pub user: String,
    pub options: CompletionOptions,
}

/// Completion fake answering by the first rule whose key appears in the
/// system instruction.
#[derive(Default)]
pub struct FakeCompletion {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl FakeCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, system_contains: &str, reply: Reply) -> Self {
        self.rules.push((system_contains.to_string(), reply));
        self
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose system instruction contains `key`.
    pub fn calls_matching(&self, key: &str) -> Vec<CompletionCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.system.contains(key))
            .collect()
    }
}

#[async_trait]
impl TextCompletion for FakeCompletion {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(
        &self,
        system_instruction: &str,
        user_content: &str,
        options: &CompletionOptions,
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(CompletionCall {
            system: system_instruction.to_string(),
            user: user_content.to_string(),
            options: options.clone(),
        });

        let reply = self
            .rules
            .iter()
            .find(|(key, _)| system_instruction.contains(key.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Text(completion)) => Ok(completion),
            Some(Reply::Empty) => Err(LyricsmithError::EmptyResponse("fake".into())),
            Some(Reply::Fail(msg)) => Err(LyricsmithError::Provider(msg)),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LyricsmithError::Provider("woke up".into()))
            }
            None => Err(LyricsmithError::Provider("no scripted reply".into())),
        }
    }
}

/// A scripted search reply.
#[derive(Debug, Clone)]
pub enum SearchReply {
    Hits(Vec<SearchHit>),
    Fail(String),
}

/// Search fake: advanced-depth calls are lyric searches, basic-depth calls
/// are fact searches.
pub struct FakeSearch {
    lyrics: SearchReply,
    facts: SearchReply,
    calls: Mutex<Vec<(String, SearchDepth, u32)>>,
}

impl FakeSearch {
    /// Both searches return nothing.
    pub fn new() -> Self {
        Self {
            lyrics: SearchReply::Hits(Vec::new()),
            facts: SearchReply::Hits(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn lyrics(mut self, reply: SearchReply) -> Self {
        self.lyrics = reply;
        self
    }

    pub fn facts(mut self, reply: SearchReply) -> Self {
        self.facts = reply;
        self
    }

    pub fn calls(&self) -> Vec<(String, SearchDepth, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(
        &self,
        query: &str,
        depth: SearchDepth,
        max_results: u32,
    ) -> Result<Vec<SearchHit>> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), depth, max_results));
        let reply = match depth {
            SearchDepth::Advanced => &self.lyrics,
            SearchDepth::Basic => &self.facts,
        };
        match reply {
            SearchReply::Hits(hits) => Ok(hits.clone()),
            SearchReply::Fail(msg) => Err(LyricsmithError::Provider(msg.clone())),
        }
    }
}

/// Build a hit with only a snippet.
pub fn snippet(text: &str) -> SearchHit {
    SearchHit {
        text: text.to_string(),
        raw_text: None,
        url: "https://example.test/page".to_string(),
    }
}

/// Build a hit carrying full page text as well as a snippet.
pub fn page(text: &str, raw: &str) -> SearchHit {
    SearchHit {
        text: text.to_string(),
        raw_text: Some(raw.to_string()),
        url: "https://example.test/page".to_string(),
    }
}

/// Encyclopedia fake.
pub struct FakeEncyclopedia {
    page: std::result::Result<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeEncyclopedia {
    pub fn found(content: &str) -> Self {
        Self {
            page: Ok(content.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self {
            page: Err("not_found".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            page: Err(msg.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encyclopedia for FakeEncyclopedia {
    async fn lookup(&self, title: &str) -> Result<EncyclopediaPage> {
        self.calls.lock().unwrap().push(title.to_string());
        match &self.page {
            Ok(content) => Ok(EncyclopediaPage {
                title: title.to_string(),
                content: content.clone(),
            }),
            Err(msg) if msg == "not_found" => Err(LyricsmithError::not_found(title)),
            Err(msg) => Err(LyricsmithError::Provider(msg.clone())),
        }
    }
}

/// Fakes wired into [`Capabilities`], with handles kept for assertions.
/// One completion fake serves both models; caching is off by default.
pub struct Harness {
    pub completion: Arc<FakeCompletion>,
    pub search: Arc<FakeSearch>,
    pub encyclopedia: Arc<FakeEncyclopedia>,
    pub caps: Capabilities,
}

impl Harness {
    pub fn new(
        completion: FakeCompletion,
        search: FakeSearch,
        encyclopedia: FakeEncyclopedia,
    ) -> Self {
        let completion = Arc::new(completion);
        let search = Arc::new(search);
        let encyclopedia = Arc::new(encyclopedia);
        let caps = Capabilities::new(
            completion.clone(),
            completion.clone(),
            search.clone(),
            encyclopedia.clone(),
        );
        Self {
            completion,
            search,
            encyclopedia,
            caps,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn SearchCache>) -> Self {
        self.caps = self.caps.with_cache(cache);
        self
    }
}
