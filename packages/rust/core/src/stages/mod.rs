//! Stage functions.
//!
//! Each stage reads the current [`RunRecord`] and returns a [`RunDelta`].
//! Stages never return `Err`: adapter failures become either an error on
//! the delta (fatal to the run) or an empty delta (recoverable).

pub mod extract;
pub mod facts;
pub mod identify;
pub mod intersperse;
pub mod search;
pub mod translate;

use lyricsmith_shared::{RunDelta, RunRecord, Stage};

use crate::context::StageContext;

/// Run `stage` against `record`.
pub async fn run(stage: Stage, ctx: &StageContext<'_>, record: &RunRecord) -> RunDelta {
    match stage {
        Stage::Identify => identify::run(ctx, record).await,
        Stage::Search => search::run(ctx, record).await,
        Stage::Extract => extract::run(ctx, record).await,
        Stage::Translate => translate::run(ctx, record).await,
        Stage::Intersperse => intersperse::run(ctx, record).await,
        Stage::Facts => facts::run(ctx, record).await,
    }
}

/// Title to work with: the identified one, else the raw request.
pub(crate) fn song_title(record: &RunRecord) -> &str {
    record
        .song_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(record.original_request())
}
