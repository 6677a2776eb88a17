//! Curious facts about the song.
//!
//! Source text comes from an ordered list of [`FactSource`]s, the first one
//! yielding non-empty content wins. Nothing in this stage is fatal: every
//! failure degrades to an empty delta or to untranslated facts.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use lyricsmith_providers::{CompletionOptions, SearchDepth};
use lyricsmith_shared::{LyricsmithError, Result, RunDelta, RunRecord};

use crate::context::{Model, StageContext};
use crate::text::truncate_chars;

/// Source text sent for fact extraction is cut to this many characters.
pub const MAX_SOURCE_CHARS: usize = 4000;
/// Lyrics excerpt used for language detection.
pub const DETECTION_EXCERPT_CHARS: usize = 500;
/// Results concatenated by the web fallback.
pub const WEB_MAX_RESULTS: u32 = 3;
/// Answer meaning "the source had nothing interesting".
pub const NO_FACTS_SENTINEL: &str = "No specific facts found";

pub(crate) const EXTRACT_PROMPT: &str = "You are a research assistant. Your task is to read the \
provided text about a song and extract 1 to 3 curious or interesting facts. Format them as a \
short, bulleted list. If no interesting facts can be found, respond with 'No specific facts \
found.'";

pub(crate) const DETECT_PROMPT: &str = "You are a language identification expert. Identify the \
dominant language of the provided song lyrics. Respond with only the English name of the \
language, for example 'Italian' or 'Spanish', and nothing else.";

/// The song a fact lookup is about.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub title: &'a str,
    pub artist: Option<&'a str>,
}

/// Encyclopedia title tried first.
pub fn encyclopedia_query(subject: &Subject<'_>) -> String {
    match subject.artist {
        Some(artist) => format!("{} (song) ({artist} song)", subject.title),
        None => format!("{} (song)", subject.title),
    }
}

/// Fact-oriented web query used by the fallback source.
pub fn web_query(subject: &Subject<'_>) -> String {
    match subject.artist {
        Some(artist) => format!(
            "interesting facts about the song '{}' by '{artist}'",
            subject.title
        ),
        None => format!("interesting facts about the song '{}'", subject.title),
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One tier of source text for fact extraction.
#[async_trait]
pub trait FactSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Source text, or `None` when this tier has nothing.
    async fn fetch(
        &self,
        ctx: &StageContext<'_>,
        subject: &Subject<'_>,
    ) -> Result<Option<String>>;
}

/// Encyclopedia page for the song.
pub struct EncyclopediaSource;

#[async_trait]
impl FactSource for EncyclopediaSource {
    fn name(&self) -> &'static str {
        "encyclopedia"
    }

    async fn fetch(
        &self,
        ctx: &StageContext<'_>,
        subject: &Subject<'_>,
    ) -> Result<Option<String>> {
        match ctx.lookup(&encyclopedia_query(subject)).await {
            Ok(page) => {
                debug!(title = %page.title, "encyclopedia page found");
                Ok(Some(page.content))
            }
            Err(LyricsmithError::NotFound(reason)) => {
                debug!(%reason, "no encyclopedia page");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Concatenated text of the top web results for a fact-oriented query.
pub struct WebSearchSource;

#[async_trait]
impl FactSource for WebSearchSource {
    fn name(&self) -> &'static str {
        "web search"
    }

    async fn fetch(
        &self,
        ctx: &StageContext<'_>,
        subject: &Subject<'_>,
    ) -> Result<Option<String>> {
        let hits = ctx
            .search(&web_query(subject), SearchDepth::Basic, WEB_MAX_RESULTS)
            .await?;
        let content = hits
            .iter()
            .filter_map(|hit| hit.best_text())
            .take(WEB_MAX_RESULTS as usize)
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(content).filter(|c| !c.is_empty()))
    }
}

/// Default source order: encyclopedia first, then the web.
pub fn default_sources() -> [&'static dyn FactSource; 2] {
    [&EncyclopediaSource, &WebSearchSource]
}

/// First non-empty content from `sources`, tried in order.
pub async fn gather(
    ctx: &StageContext<'_>,
    subject: &Subject<'_>,
    sources: &[&dyn FactSource],
) -> Option<String> {
    for source in sources {
        match source.fetch(ctx, subject).await {
            Ok(Some(content)) if !content.trim().is_empty() => {
                info!(source = source.name(), "fact source found");
                return Some(content);
            }
            Ok(_) => debug!(source = source.name(), "fact source had nothing"),
            Err(e) => warn!(source = source.name(), error = %e, "fact source failed"),
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    run_with_sources(ctx, record, &default_sources()).await
}

pub async fn run_with_sources(
    ctx: &StageContext<'_>,
    record: &RunRecord,
    sources: &[&dyn FactSource],
) -> RunDelta {
    let subject = Subject {
        title: super::song_title(record),
        artist: record.song_artist.as_deref(),
    };
    info!(title = subject.title, "looking for curious facts");

    let Some(content) = gather(ctx, &subject, sources).await else {
        info!("no source for curious facts");
        return RunDelta::empty();
    };

    let Some(facts) = extract_facts(ctx, &subject, &content).await else {
        return RunDelta::empty();
    };

    let facts = match record.target_language() {
        Some(language) => translate_facts(ctx, &subject, facts, language).await,
        None => match_lyrics_language(ctx, record, &subject, facts).await,
    };

    RunDelta {
        curious_facts: Some(facts),
        ..RunDelta::empty()
    }
}

async fn extract_facts(
    ctx: &StageContext<'_>,
    subject: &Subject<'_>,
    content: &str,
) -> Option<String> {
    let user = format!(
        "Extract 1-3 curious facts from this article about '{}':\n\n{}",
        subject.title,
        truncate_chars(content, MAX_SOURCE_CHARS)
    );
    match ctx
        .complete(Model::Translator, EXTRACT_PROMPT, &user, &CompletionOptions::default())
        .await
    {
        Ok(c) if c.text.contains(NO_FACTS_SENTINEL) => {
            info!("source had no curious facts");
            None
        }
        Ok(c) => Some(c.text),
        Err(e) => {
            warn!(error = %e, "fact extraction failed");
            None
        }
    }
}

/// Without a requested language, present facts in the language of the
/// lyrics when that is not English.
async fn match_lyrics_language(
    ctx: &StageContext<'_>,
    record: &RunRecord,
    subject: &Subject<'_>,
    facts: String,
) -> String {
    let Some(lyrics) = record.lyrics() else {
        return facts;
    };
    match detect_language(ctx, truncate_chars(lyrics, DETECTION_EXCERPT_CHARS)).await {
        Ok(language) if is_english(&language) => facts,
        Ok(language) => {
            info!(%language, "matching facts to the lyrics language");
            translate_facts(ctx, subject, facts, &language).await
        }
        Err(e) => {
            warn!(error = %e, "language detection failed, keeping facts as is");
            facts
        }
    }
}

async fn detect_language(ctx: &StageContext<'_>, excerpt: &str) -> Result<String> {
    let reply = ctx
        .complete(Model::Analyst, DETECT_PROMPT, excerpt, &CompletionOptions::default())
        .await?;
    let language = reply
        .text
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| !c.is_alphabetic())
        .to_string();
    if language.is_empty() {
        return Err(LyricsmithError::parse("language detection returned no language"));
    }
    debug!(%language, "lyrics language detected");
    Ok(language)
}

fn is_english(language: &str) -> bool {
    language.eq_ignore_ascii_case("english") || language.eq_ignore_ascii_case("en")
}

async fn translate_facts(
    ctx: &StageContext<'_>,
    subject: &Subject<'_>,
    facts: String,
    language: &str,
) -> String {
    let system = format!(
        "You are a professional translator. Translate the following facts about '{}' to \
{language}. Maintain the bullet list format and factual accuracy. Only translate the text, keep \
any formatting like bullet points or dashes.",
        subject.title
    );
    match ctx
        .complete(Model::Translator, &system, &facts, &CompletionOptions::default())
        .await
    {
        Ok(c) => {
            debug!(%language, "facts translated");
            c.text
        }
        Err(e) => {
            warn!(%language, error = %e, "could not translate facts");
            facts
        }
    }
}
