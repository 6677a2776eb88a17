//! Plain-text rendering of a finished run.

use std::fmt::Write;

use lyricsmith_shared::{RunOutcome, RunRecord};

const RULE_WIDTH: usize = 50;

/// Render a terminal record for the console.
pub(crate) fn render(record: &RunRecord) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "\n{heavy}");

    match record.outcome() {
        RunOutcome::Failed { stage, message } => {
            let _ = writeln!(out, "Error during {}: {message}", stage.phase());
        }
        RunOutcome::NotFound { message } => {
            let _ = writeln!(out, "No lyrics found: {message}");
        }
        RunOutcome::Empty => {
            let _ = writeln!(out, "The run finished without finding lyrics.");
        }
        RunOutcome::Lyrics => {
            let _ = writeln!(out, "{}", lyrics_heading(record));
            let _ = writeln!(out, "{heavy}\n");
            let body = record
                .interspersed_lyrics
                .as_deref()
                .or(record.lyrics())
                .unwrap_or_default();
            let _ = writeln!(out, "{body}");
        }
    }

    if let Some(facts) = record.curious_facts.as_deref().filter(|f| !f.trim().is_empty()) {
        let _ = writeln!(out, "\n{light}");
        let _ = writeln!(out, "Curious Facts");
        let _ = writeln!(out, "{light}\n");
        let _ = writeln!(out, "{facts}");
    }

    let _ = writeln!(out, "\n{heavy}");
    out
}

fn lyrics_heading(record: &RunRecord) -> String {
    let title = record
        .song_title
        .as_deref()
        .unwrap_or(record.original_request());
    let mut heading = format!("Lyrics for '{title}'");
    if let Some(artist) = &record.song_artist {
        let _ = write!(heading, " by {artist}");
    }
    if record.interspersed_lyrics.is_some() {
        if let Some(lang) = record.target_language() {
            let _ = write!(heading, " (with {lang} translation)");
        }
    }
    heading
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricsmith_shared::{RunDelta, RunError, RunId, RunRequest, Stage};

    fn record(target: Option<&str>, delta: RunDelta) -> RunRecord {
        let request = RunRequest::new("bella ciao", target.map(String::from));
        let mut record = RunRecord::new(RunId::new(), request);
        record.apply(delta);
        record
    }

    #[test]
    fn lyrics_with_artist_and_facts() {
        let out = render(&record(
            None,
            RunDelta {
                song_title: Some("Imagine".into()),
                song_artist: Some("John Lennon".into()),
                extracted_lyrics: Some("Imagine there's no heaven".into()),
                curious_facts: Some("- Released in 1971.".into()),
                ..RunDelta::empty()
            },
        ));

        assert!(out.contains("Lyrics for 'Imagine' by John Lennon\n"));
        assert!(out.contains("Imagine there's no heaven"));
        assert!(out.contains("Curious Facts"));
        assert!(out.contains("- Released in 1971."));
        assert!(!out.contains("translation"));
    }

    #[test]
    fn interspersed_lyrics_take_precedence() {
        let out = render(&record(
            Some("French"),
            RunDelta {
                song_title: Some("Bella Ciao".into()),
                extracted_lyrics: Some("o bella ciao".into()),
                translated_lyrics: Some("oh belle au revoir".into()),
                interspersed_lyrics: Some("o bella ciao\noh belle au revoir".into()),
                ..RunDelta::empty()
            },
        ));

        assert!(out.contains("Lyrics for 'Bella Ciao' (with French translation)"));
        assert!(out.contains("o bella ciao\noh belle au revoir"));
        assert!(!out.contains("Curious Facts"));
    }

    #[test]
    fn failure_and_not_found_read_differently() {
        let failed = render(&record(
            None,
            RunDelta::failure(Stage::Search, "an error occurred during the web search: HTTP 500"),
        ));
        assert!(failed.contains("Error during web search: an error occurred during the web search"));

        let missing = render(&record(
            None,
            RunDelta::with_error(RunError::no_results(
                Stage::Search,
                "web search produced no results",
            )),
        ));
        assert!(missing.contains("No lyrics found: web search produced no results"));
        assert!(!missing.contains("Error during"));
    }

    #[test]
    fn empty_run_has_neutral_message() {
        let out = render(&record(None, RunDelta::empty()));
        assert!(out.contains("without finding lyrics"));
        assert!(out.starts_with(&format!("\n{}", "=".repeat(RULE_WIDTH))));
    }
}
