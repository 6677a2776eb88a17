//! Lyric search, consulting the result cache first.

use tracing::{debug, info, warn};

use lyricsmith_providers::{SearchDepth, SearchHit};
use lyricsmith_shared::{RunDelta, RunRecord, Stage};

use crate::context::StageContext;

/// Query sent to the web search for a song's lyrics.
pub fn lyrics_query(title: &str, artist: Option<&str>) -> String {
    match artist {
        Some(artist) => format!("full complete song lyrics for '{title}' by {artist}"),
        None => format!("full complete song lyrics for '{title}'"),
    }
}

/// Keep one text per hit, full page text first; hits with no text are dropped.
pub fn collect_snippets(hits: &[SearchHit]) -> Vec<String> {
    hits.iter()
        .filter_map(|hit| {
            let text = hit.best_text();
            match (text, hit.raw_text.as_deref()) {
                (Some(t), Some(raw)) if t == raw => {
                    debug!(chars = t.chars().count(), url = %hit.url, "using full page text");
                }
                (Some(t), _) => {
                    debug!(chars = t.chars().count(), url = %hit.url, "using snippet");
                }
                (None, _) => {}
            }
            text.map(str::to_string)
        })
        .collect()
}

pub async fn run(ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    let Some(title) = record.song_title.as_deref().filter(|t| !t.trim().is_empty()) else {
        return RunDelta::failure(Stage::Search, "no song title to search for");
    };
    let artist = record.song_artist.as_deref();
    let query = lyrics_query(title, artist);
    info!(%title, artist = artist.unwrap_or(""), "searching for lyrics");

    if let Some(cached) = ctx.cached_search(&query).await {
        debug!(results = cached.len(), "using cached search results");
        return RunDelta {
            search_results: Some(cached),
            ..RunDelta::empty()
        };
    }

    let hits = match ctx
        .search(&query, SearchDepth::Advanced, ctx.config.search_max_results)
        .await
    {
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "lyrics search failed");
            return RunDelta::failure(
                Stage::Search,
                format!("an error occurred during the {}: {e}", Stage::Search.phase()),
            );
        }
    };

    let snippets = collect_snippets(&hits);
    if snippets.is_empty() {
        warn!("web search returned no usable results");
    }
    ctx.cache_search(&query, &snippets).await;

    RunDelta {
        search_results: Some(snippets),
        ..RunDelta::empty()
    }
}
