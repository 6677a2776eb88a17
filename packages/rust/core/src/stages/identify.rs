//! Identification: turn the free-text request into a song title and artist.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};

use lyricsmith_providers::CompletionOptions;
use lyricsmith_shared::{LyricsmithError, Result, RunDelta, RunRecord, Stage};

use crate::context::{Model, StageContext};

pub(crate) const SYSTEM_PROMPT: &str = "You are an expert musicologist. Your task is to analyze \
a user's query about a song and determine the precise song title and artist. Respond ONLY with \
a single, valid JSON object with two keys: 'title' and 'artist'. The artist can be null if \
unknown. If you cannot deduce a specific song, return the original query in the 'title' field. \
Always return valid JSON format like: {\"title\": \"Song Name\", \"artist\": \"Artist Name\"}";

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("valid regex")
});

/// A parsed identification answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub title: String,
    pub artist: Option<String>,
}

#[derive(Deserialize)]
struct RawIdentification {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artist: Option<String>,
}

/// Parse the model's two-field answer. Accepts a fenced block or JSON
/// wrapped in prose; rejects a missing or blank title.
pub fn parse_identification(text: &str) -> Result<Identification> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str());

    let raw: RawIdentification = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(first) => {
            let start = body.find('{');
            let end = body.rfind('}');
            match (start, end) {
                (Some(s), Some(e)) if s < e => serde_json::from_str(&body[s..=e])
                    .map_err(|e| LyricsmithError::parse(format!("identification: {e}")))?,
                _ => return Err(LyricsmithError::parse(format!("identification: {first}"))),
            }
        }
    };

    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LyricsmithError::parse("identification has no title"))?;

    let artist = raw
        .artist
        .map(|a| a.trim().to_string())
        .filter(|a| {
            !a.is_empty() && !a.eq_ignore_ascii_case("null") && !a.eq_ignore_ascii_case("unknown")
        });

    Ok(Identification { title, artist })
}

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    let request = record.original_request();
    info!(request, "analyzing request");

    let user = format!("Analyze this query: '{request}'");
    let reply = ctx
        .complete(Model::Analyst, SYSTEM_PROMPT, &user, &CompletionOptions::default())
        .await;

    let identification = match reply {
        Ok(completion) => match parse_identification(&completion.text) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "unparseable identification, using the request as title");
                fallback(request)
            }
        },
        Err(LyricsmithError::EmptyResponse(model)) => {
            warn!(%model, "empty identification response, using the request as title");
            fallback(request)
        }
        Err(e) => {
            warn!(error = %e, "identification call failed");
            return RunDelta::failure(
                Stage::Identify,
                format!("an error occurred during {}: {e}", Stage::Identify.phase()),
            );
        }
    };

    if identification.title != request {
        match &identification.artist {
            Some(artist) => info!(title = %identification.title, %artist, "song identified"),
            None => info!(title = %identification.title, "song identified"),
        }
    }

    RunDelta {
        song_title: Some(identification.title),
        song_artist: identification.artist,
        ..RunDelta::empty()
    }
}

fn fallback(request: &str) -> Identification {
    Identification {
        title: request.to_string(),
        artist: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WorkflowConfig;
    use crate::testing::{FakeCompletion, FakeEncyclopedia, FakeSearch, Harness, Reply};
    use lyricsmith_shared::{ErrorKind, RunId, RunRequest};

    fn record(request: &str) -> RunRecord {
        RunRecord::new(RunId::new(), RunRequest::new(request, None))
    }

    async fn identify_with(reply: Reply, request: &str) -> (RunDelta, Harness) {
        let harness = Harness::new(
            FakeCompletion::new().on("musicologist", reply),
            FakeSearch::new(),
            FakeEncyclopedia::missing(),
        );
        let config = WorkflowConfig::default();
        let ctx = StageContext::new(&harness.caps, &config);
        let delta = run(&ctx, &record(request)).await;
        (delta, harness)
    }

    #[test]
    fn parses_plain_json() {
        let id = parse_identification(r#"{"title": "Bella Ciao", "artist": null}"#).unwrap();
        assert_eq!(id.title, "Bella Ciao");
        assert_eq!(id.artist, None);
    }

    #[test]
    fn parses_fenced_and_wrapped_json() {
        let fenced = "```json\n{\"title\": \"Imagine\", \"artist\": \"John Lennon\"}\n```";
        let id = parse_identification(fenced).unwrap();
        assert_eq!(id.artist.as_deref(), Some("John Lennon"));

        let wrapped = "Sure! {\"title\": \"Yesterday\", \"artist\": \"The Beatles\"} Enjoy.";
        assert_eq!(parse_identification(wrapped).unwrap().title, "Yesterday");
    }

    #[test]
    fn rejects_missing_title_and_garbage() {
        assert!(parse_identification(r#"{"artist": "Queen"}"#).is_err());
        assert!(parse_identification(r#"{"title": "  "}"#).is_err());
        assert!(parse_identification("I think it is Bohemian Rhapsody").is_err());
    }

    #[test]
    fn placeholder_artists_are_absent() {
        let id = parse_identification(r#"{"title": "X", "artist": "Unknown"}"#).unwrap();
        assert_eq!(id.artist, None);
    }

    #[tokio::test]
    async fn identified_song_sets_title_and_artist() {
        let (delta, harness) = identify_with(
            Reply::text(r#"{"title": "Bohemian Rhapsody", "artist": "Queen"}"#),
            "that queen song about galileo",
        )
        .await;

        assert_eq!(delta.song_title.as_deref(), Some("Bohemian Rhapsody"));
        assert_eq!(delta.song_artist.as_deref(), Some("Queen"));
        assert!(delta.error.is_none());

        let calls = harness.completion.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].user.contains("that queen song about galileo"));
    }

    #[tokio::test]
    async fn malformed_answer_falls_back_to_request() {
        let (delta, _) = identify_with(Reply::text("not json at all"), "Bella Ciao").await;
        assert_eq!(delta.song_title.as_deref(), Some("Bella Ciao"));
        assert_eq!(delta.song_artist, None);
        assert!(delta.error.is_none());
    }

    #[tokio::test]
    async fn empty_answer_falls_back_to_request() {
        let (delta, _) = identify_with(Reply::Empty, "Bella Ciao").await;
        assert_eq!(delta.song_title.as_deref(), Some("Bella Ciao"));
        assert!(delta.error.is_none());
    }

    #[tokio::test]
    async fn transport_failure_sets_error() {
        let (delta, _) = identify_with(Reply::Fail("connection reset".into()), "Bella Ciao").await;
        let error = delta.error.unwrap();
        assert_eq!(error.stage, Stage::Identify);
        assert_eq!(error.kind, ErrorKind::Failure);
        assert!(error.message.contains("query analysis"));
        assert!(delta.song_title.is_none());
    }
}
