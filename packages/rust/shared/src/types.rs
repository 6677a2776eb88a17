//! Run record model: the state threaded through one lyrics pipeline run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LyricsmithError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Identifier of a processing stage, in canonical graph order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Identify,
    Search,
    Extract,
    Translate,
    Intersperse,
    Facts,
}

impl Stage {
    /// All stages in canonical order.
    pub const ALL: [Stage; 6] = [
        Stage::Identify,
        Stage::Search,
        Stage::Extract,
        Stage::Translate,
        Stage::Intersperse,
        Stage::Facts,
    ];

    /// Stable label used in logs and serialized records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Search => "search",
            Self::Extract => "extract",
            Self::Translate => "translate",
            Self::Intersperse => "intersperse",
            Self::Facts => "facts",
        }
    }

    /// Human-readable phase name for user-facing messages.
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Identify => "query analysis",
            Self::Search => "web search",
            Self::Extract => "lyrics extraction",
            Self::Translate => "translation",
            Self::Intersperse => "interspersion",
            Self::Facts => "curious facts",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RunError
// ---------------------------------------------------------------------------

/// Distinguishes "nothing to show" outcomes from hard failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The web search returned nothing usable.
    NoResults,
    /// Search results were found but contained no lyrics.
    NoLyrics,
    /// An external call or a guard failed.
    Failure,
}

/// The error recorded on a run, with the stage that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunError {
    #[serde(rename = "error")]
    pub message: String,
    #[serde(rename = "errorStage")]
    pub stage: Stage,
    #[serde(rename = "errorKind")]
    pub kind: ErrorKind,
}

impl RunError {
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            kind: ErrorKind::Failure,
        }
    }

    pub fn no_results(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            kind: ErrorKind::NoResults,
        }
    }

    pub fn no_lyrics(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stage,
            kind: ErrorKind::NoLyrics,
        }
    }
}

// ---------------------------------------------------------------------------
// RunRequest
// ---------------------------------------------------------------------------

/// The caller's input: free text plus an optional target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
}

impl RunRequest {
    pub fn new(request: impl Into<String>, target_language: Option<String>) -> Self {
        Self {
            request: request.into(),
            target_language,
        }
    }

    /// Trim both fields; reject an empty request and drop a blank language.
    pub fn normalized(self) -> Result<Self> {
        let request = self.request.trim().to_string();
        if request.is_empty() {
            return Err(LyricsmithError::validation("request text must not be empty"));
        }
        let target_language = self
            .target_language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        Ok(Self {
            request,
            target_language,
        })
    }
}

// ---------------------------------------------------------------------------
// RunDelta
// ---------------------------------------------------------------------------

/// Partial update produced by one stage invocation. `None` leaves the
/// corresponding record field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunDelta {
    pub song_title: Option<String>,
    pub song_artist: Option<String>,
    /// Fully replaces the record's search results when present.
    pub search_results: Option<Vec<String>>,
    pub extracted_lyrics: Option<String>,
    pub translated_lyrics: Option<String>,
    pub interspersed_lyrics: Option<String>,
    pub curious_facts: Option<String>,
    pub error: Option<RunError>,
}

impl RunDelta {
    /// A delta that changes nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A delta carrying only an error.
    pub fn with_error(error: RunError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// A delta carrying only a [`ErrorKind::Failure`] error.
    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        Self::with_error(RunError::failure(stage, message))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// RunRecord
// ---------------------------------------------------------------------------

/// The accumulating state of one run. Serializes as a flat key-value map.
///
/// The request text and target language are fixed at construction; every
/// other field changes only through [`RunRecord::apply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    run_id: RunId,
    original_request: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_artist: Option<String>,
    #[serde(default)]
    pub search_results: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interspersed_lyrics: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curious_facts: Option<String>,
    #[serde(flatten)]
    pub error: Option<RunError>,
    /// Stages executed so far, in order.
    #[serde(default)]
    stages: Vec<Stage>,
}

impl RunRecord {
    /// Start a record from an already-normalized request.
    pub fn new(run_id: RunId, request: RunRequest) -> Self {
        Self {
            run_id,
            original_request: request.request,
            target_language: request.target_language,
            song_title: None,
            song_artist: None,
            search_results: Vec::new(),
            extracted_lyrics: None,
            translated_lyrics: None,
            interspersed_lyrics: None,
            curious_facts: None,
            error: None,
            stages: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn original_request(&self) -> &str {
        &self.original_request
    }

    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    /// Executed stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn has_run(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    /// Record that `stage` is about to run. Returns `false` if it already ran.
    pub fn mark_started(&mut self, stage: Stage) -> bool {
        if self.has_run(stage) {
            return false;
        }
        self.stages.push(stage);
        true
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracted lyrics, if present and non-empty.
    pub fn lyrics(&self) -> Option<&str> {
        self.extracted_lyrics.as_deref().filter(|l| !l.is_empty())
    }

    /// Merge a stage delta. Present fields replace the current value; the
    /// first recorded error is kept.
    pub fn apply(&mut self, delta: RunDelta) {
        let RunDelta {
            song_title,
            song_artist,
            search_results,
            extracted_lyrics,
            translated_lyrics,
            interspersed_lyrics,
            curious_facts,
            error,
        } = delta;

        if song_title.is_some() {
            self.song_title = song_title;
        }
        if song_artist.is_some() {
            self.song_artist = song_artist;
        }
        if let Some(results) = search_results {
            self.search_results = results;
        }
        if extracted_lyrics.is_some() {
            self.extracted_lyrics = extracted_lyrics;
        }
        if translated_lyrics.is_some() {
            self.translated_lyrics = translated_lyrics;
        }
        if interspersed_lyrics.is_some() {
            self.interspersed_lyrics = interspersed_lyrics;
        }
        if curious_facts.is_some() {
            self.curious_facts = curious_facts;
        }
        if self.error.is_none() {
            self.error = error;
        }
    }

    /// Classify the record for display.
    pub fn outcome(&self) -> RunOutcome {
        match &self.error {
            Some(err) => match err.kind {
                ErrorKind::NoResults | ErrorKind::NoLyrics => RunOutcome::NotFound {
                    message: err.message.clone(),
                },
                ErrorKind::Failure => RunOutcome::Failed {
                    stage: err.stage,
                    message: err.message.clone(),
                },
            },
            None if self.lyrics().is_some() => RunOutcome::Lyrics,
            None => RunOutcome::Empty,
        }
    }

    /// Check the structural invariants between populated fields.
    pub fn validate(&self) -> Result<()> {
        if matches!(&self.extracted_lyrics, Some(l) if l.is_empty()) {
            return Err(LyricsmithError::validation(
                "extracted lyrics present but empty",
            ));
        }
        if self.translated_lyrics.is_some() {
            if self.target_language.is_none() {
                return Err(LyricsmithError::validation(
                    "translated lyrics present without a target language",
                ));
            }
            if self.lyrics().is_none() {
                return Err(LyricsmithError::validation(
                    "translated lyrics present without extracted lyrics",
                ));
            }
        }
        if self.interspersed_lyrics.is_some() && self.translated_lyrics.is_none() {
            return Err(LyricsmithError::validation(
                "interspersed lyrics present without translated lyrics",
            ));
        }
        Ok(())
    }
}

/// Display classification of a terminal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Lyrics were extracted (translation and facts may accompany them).
    Lyrics,
    /// The run ended because no lyrics could be found.
    NotFound { message: String },
    /// A stage failed.
    Failed { stage: Stage, message: String },
    /// The run ended with neither lyrics nor an error.
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(target: Option<&str>) -> RunRecord {
        let request = RunRequest::new("Bella Ciao", target.map(String::from))
            .normalized()
            .expect("valid request");
        RunRecord::new(RunId::new(), request)
    }

    #[test]
    fn request_normalization() {
        let req = RunRequest::new("  Bella Ciao ", Some("  ".into()))
            .normalized()
            .unwrap();
        assert_eq!(req.request, "Bella Ciao");
        assert!(req.target_language.is_none());

        let err = RunRequest::new("   ", None).normalized().unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn apply_overwrites_search_results() {
        let mut rec = record(None);
        rec.apply(RunDelta {
            search_results: Some(vec!["a".into(), "b".into(), "c".into()]),
            ..RunDelta::default()
        });
        rec.apply(RunDelta {
            search_results: Some(vec!["combined".into()]),
            ..RunDelta::default()
        });
        assert_eq!(rec.search_results, vec!["combined".to_string()]);
    }

    #[test]
    fn apply_keeps_first_error() {
        let mut rec = record(None);
        rec.apply(RunDelta::failure(Stage::Search, "first"));
        rec.apply(RunDelta::failure(Stage::Extract, "second"));
        let err = rec.error.as_ref().unwrap();
        assert_eq!(err.message, "first");
        assert_eq!(err.stage, Stage::Search);
    }

    #[test]
    fn empty_delta_changes_nothing() {
        let mut rec = record(Some("French"));
        rec.song_title = Some("Bella Ciao".into());
        rec.apply(RunDelta::empty());
        assert_eq!(rec.song_title.as_deref(), Some("Bella Ciao"));
        assert!(RunDelta::empty().is_empty());
        assert!(!RunDelta::failure(Stage::Facts, "x").is_empty());
    }

    #[test]
    fn mark_started_is_at_most_once() {
        let mut rec = record(None);
        assert!(rec.mark_started(Stage::Identify));
        assert!(!rec.mark_started(Stage::Identify));
        assert_eq!(rec.stages(), &[Stage::Identify]);
    }

    #[test]
    fn outcome_classification() {
        let mut rec = record(None);
        assert_eq!(rec.outcome(), RunOutcome::Empty);

        rec.extracted_lyrics = Some("Una mattina mi son svegliato".into());
        assert_eq!(rec.outcome(), RunOutcome::Lyrics);

        let mut rec = record(None);
        rec.apply(RunDelta::with_error(RunError::no_lyrics(
            Stage::Extract,
            "no lyrics found",
        )));
        assert!(matches!(rec.outcome(), RunOutcome::NotFound { .. }));

        let mut rec = record(None);
        rec.apply(RunDelta::failure(Stage::Search, "boom"));
        assert_eq!(
            rec.outcome(),
            RunOutcome::Failed {
                stage: Stage::Search,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn validate_catches_orphan_translation() {
        let mut rec = record(None);
        rec.extracted_lyrics = Some("lyrics".into());
        rec.translated_lyrics = Some("paroles".into());
        assert!(rec.validate().is_err());

        let mut rec = record(Some("French"));
        rec.interspersed_lyrics = Some("mixed".into());
        assert!(rec.validate().is_err());

        let mut rec = record(Some("French"));
        rec.extracted_lyrics = Some("lyrics".into());
        rec.translated_lyrics = Some("paroles".into());
        rec.interspersed_lyrics = Some("lyrics\nparoles".into());
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn record_serializes_flat() {
        let mut rec = record(Some("French"));
        rec.song_title = Some("Bella Ciao".into());
        rec.apply(RunDelta::with_error(RunError::no_results(
            Stage::Search,
            "web search produced no results",
        )));

        let json = serde_json::to_value(&rec).expect("serialize");
        assert_eq!(json["originalRequest"], "Bella Ciao");
        assert_eq!(json["targetLanguage"], "French");
        assert_eq!(json["songTitle"], "Bella Ciao");
        assert_eq!(json["error"], "web search produced no results");
        assert_eq!(json["errorStage"], "search");
        assert_eq!(json["errorKind"], "no_results");
        assert!(json.get("extractedLyrics").is_none());
    }

    #[test]
    fn record_without_error_deserializes() {
        let mut rec = record(None);
        rec.extracted_lyrics = Some("lyrics".into());
        let json = serde_json::to_string(&rec).unwrap();
        let parsed: RunRecord = serde_json::from_str(&json).unwrap();
        assert!(parsed.error.is_none());
        assert_eq!(parsed.lyrics(), Some("lyrics"));
    }
}
