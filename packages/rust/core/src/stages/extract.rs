//! Lyric extraction: merge and clean lyrics out of the search results in a
//! single completion call.

use tracing::{info, warn};

use lyricsmith_providers::CompletionOptions;
use lyricsmith_shared::{RunDelta, RunError, RunRecord, Stage};

use crate::context::{Model, StageContext};
use crate::text::truncate_chars;

/// Results considered, in rank order.
pub const TOP_RESULTS: usize = 5;
pub const SOURCE_SEPARATOR: &str = "\n\n---SOURCE---\n\n";
/// Upper bound on the combined context, in characters.
pub const MAX_CONTEXT_CHARS: usize = 60_000;
pub const TRUNCATION_MARKER: &str = "\n\n[... search results truncated ...]";
/// Answer meaning "there are no lyrics in these results".
pub const NOT_FOUND_SENTINEL: &str = "LYRICS_NOT_FOUND";
/// Shorter answers are not accepted as lyrics.
pub const MIN_LYRICS_CHARS: usize = 10;

pub(crate) const SYSTEM_PROMPT: &str = "You are a lyrics extraction expert. You are given web \
search results, separated by ---SOURCE--- markers, for a song.

Instructions:
1. Find the source that contains the most complete lyrics
2. Extract the FULL lyrics (all verses, choruses, bridges)
3. Format them properly with clear verse/chorus structure
4. If lyrics are split across multiple sources, combine them to get the complete version
5. Remove any website navigation, ads, comments, or non-lyric content

Return ONLY the formatted lyrics, nothing else. If no lyrics are found, return \"LYRICS_NOT_FOUND\".";

/// Join the top results with separators, cutting the tail (and marking the
/// cut) when the total exceeds `max_chars`.
pub fn build_context(results: &[String], max_chars: usize) -> String {
    let joined = results
        .iter()
        .take(TOP_RESULTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(SOURCE_SEPARATOR);

    let cut = truncate_chars(&joined, max_chars);
    if cut.len() < joined.len() {
        warn!(max_chars, "search context truncated");
        format!("{cut}{TRUNCATION_MARKER}")
    } else {
        joined
    }
}

fn is_sentinel(text: &str) -> bool {
    text.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.') == NOT_FOUND_SENTINEL
}

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    if record.search_results.is_empty() {
        return RunDelta::failure(Stage::Extract, "no search results to extract lyrics from");
    }

    info!("extracting lyrics from search results");
    let context = build_context(&record.search_results, MAX_CONTEXT_CHARS);

    let title = super::song_title(record);
    let subject = match record.song_artist.as_deref() {
        Some(artist) => format!("\"{title}\" by {artist}"),
        None => format!("\"{title}\""),
    };
    let user = format!("Search results for the song {subject}:\n\n{context}");

    let reply = ctx
        .complete(Model::Analyst, SYSTEM_PROMPT, &user, &CompletionOptions::default())
        .await;

    let completion = match reply {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "lyrics extraction failed");
            return RunDelta {
                search_results: Some(vec![context]),
                error: Some(RunError::failure(
                    Stage::Extract,
                    format!("{} failed: {e}", Stage::Extract.phase()),
                )),
                ..RunDelta::empty()
            };
        }
    };

    if completion.truncated {
        warn!("extracted lyrics may be incomplete: output limit reached");
    }
    if completion.filtered {
        warn!("extracted lyrics were filtered by the provider");
    }

    let lyrics = completion.text.trim();
    let error = if is_sentinel(lyrics) {
        warn!("no lyrics in search results");
        Some(RunError::no_lyrics(Stage::Extract, "no lyrics found"))
    } else if lyrics.chars().count() < MIN_LYRICS_CHARS {
        warn!(chars = lyrics.chars().count(), "extracted text too short");
        Some(RunError::failure(
            Stage::Extract,
            "could not extract meaningful lyrics from the search results",
        ))
    } else {
        None
    };

    match error {
        Some(error) => RunDelta {
            search_results: Some(vec![context]),
            error: Some(error),
            ..RunDelta::empty()
        },
        None => {
            info!(chars = lyrics.chars().count(), "lyrics extracted");
            RunDelta {
                search_results: Some(vec![context]),
                extracted_lyrics: Some(lyrics.to_string()),
                ..RunDelta::empty()
            }
        }
    }
}
