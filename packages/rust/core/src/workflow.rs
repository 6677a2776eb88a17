//! The stage graph and its driver.
//!
//! ```text
//! identify -> search -> extract -> translate -> intersperse -> facts -> end
//!                  \           \______________________________/
//!                   `-> end (no results)
//! ```
//!
//! Routing is a pure function of the finished stage and the merged record
//! ([`next_stage`]); the [`Workflow`] driver only runs stages, merges their
//! deltas and follows the transitions.

use std::time::Instant;

use tracing::{Level, debug, enabled, info, instrument, warn};

use lyricsmith_shared::{Result, RunDelta, RunError, RunId, RunRecord, RunRequest, Stage};

use crate::context::{Capabilities, StageContext, WorkflowConfig};
use crate::stages;
use crate::text::{preview, truncate_chars};

/// Message recorded when the lyric search finds nothing.
pub const NO_RESULTS_MESSAGE: &str = "web search produced no results";

const DUMP_TEXT_CHARS: usize = 250;
const DUMP_RESULT_CHARS: usize = 150;

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The facts stage finished.
    Completed,
    /// A stage recorded an error.
    Failed,
    /// The lyric search produced nothing to extract from.
    NoSearchResults,
}

/// What follows a finished stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(Stage),
    End(EndReason),
}

/// Route after `current` has run and its delta has been merged into `record`.
pub fn next_stage(current: Stage, record: &RunRecord) -> Transition {
    if record.has_error() {
        return Transition::End(EndReason::Failed);
    }
    match current {
        Stage::Identify => Transition::Next(Stage::Search),
        Stage::Search if record.search_results.is_empty() => {
            Transition::End(EndReason::NoSearchResults)
        }
        Stage::Search => Transition::Next(Stage::Extract),
        Stage::Extract if record.target_language().is_some() && record.lyrics().is_some() => {
            Transition::Next(Stage::Translate)
        }
        Stage::Extract => Transition::Next(Stage::Facts),
        Stage::Translate => Transition::Next(Stage::Intersperse),
        Stage::Intersperse => Transition::Next(Stage::Facts),
        Stage::Facts => Transition::End(EndReason::Completed),
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage runs.
    fn stage_started(&self, stage: Stage);
    /// Called after a stage's delta has been merged.
    fn stage_finished(&self, stage: Stage, record: &RunRecord);
    /// Called once with the terminal record.
    fn done(&self, record: &RunRecord);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn stage_finished(&self, _stage: Stage, _record: &RunRecord) {}
    fn done(&self, _record: &RunRecord) {}
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Runs requests through the stage graph. Holds no per-run state, so one
/// instance can serve concurrent runs.
pub struct Workflow {
    caps: Capabilities,
    config: WorkflowConfig,
}

impl Workflow {
    pub fn new(caps: Capabilities, config: WorkflowConfig) -> Self {
        Self { caps, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run a request to completion without progress reporting.
    pub async fn run(&self, request: RunRequest) -> Result<RunRecord> {
        self.run_with_progress(request, &SilentProgress).await
    }

    /// Run a request to completion.
    ///
    /// Fails only when the request itself is invalid; everything that goes
    /// wrong inside a stage is recorded on the returned record.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run_with_progress(
        &self,
        request: RunRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<RunRecord> {
        let request = request.normalized()?;
        let mut record = RunRecord::new(RunId::new(), request);
        tracing::Span::current().record("run_id", tracing::field::display(record.run_id()));

        let start = Instant::now();
        info!(
            request = record.original_request(),
            target_language = record.target_language().unwrap_or(""),
            "starting run"
        );

        let ctx = StageContext::new(&self.caps, &self.config);
        let mut stage = Stage::Identify;

        loop {
            if !record.mark_started(stage) {
                warn!(%stage, "stage already ran, stopping");
                record.apply(RunDelta::failure(
                    stage,
                    format!("{} was scheduled twice", stage.phase()),
                ));
                break;
            }

            progress.stage_started(stage);
            let delta = stages::run(stage, &ctx, &record).await;
            record.apply(delta);
            dump_record(stage, &record);
            progress.stage_finished(stage, &record);

            match next_stage(stage, &record) {
                Transition::Next(next) => stage = next,
                Transition::End(reason) => {
                    if reason == EndReason::NoSearchResults {
                        record.apply(RunDelta::with_error(RunError::no_results(
                            Stage::Search,
                            NO_RESULTS_MESSAGE,
                        )));
                    }
                    debug!(?reason, "run finished");
                    break;
                }
            }
        }

        if let Err(e) = record.validate() {
            warn!(error = %e, "terminal record violates an invariant");
        }

        progress.done(&record);
        info!(
            outcome = ?record.outcome(),
            stages = record.stages().len(),
            elapsed_ms = start.elapsed().as_millis(),
            "run complete"
        );

        Ok(record)
    }
}

/// One debug event per populated field, long values cut.
fn dump_record(stage: Stage, record: &RunRecord) {
    if !enabled!(Level::DEBUG) {
        return;
    }

    let text_fields = [
        ("song_title", record.song_title.as_deref()),
        ("song_artist", record.song_artist.as_deref()),
        ("extracted_lyrics", record.extracted_lyrics.as_deref()),
        ("translated_lyrics", record.translated_lyrics.as_deref()),
        ("interspersed_lyrics", record.interspersed_lyrics.as_deref()),
        ("curious_facts", record.curious_facts.as_deref()),
    ];
    for (field, value) in text_fields {
        if let Some(value) = value {
            let shown = truncate_chars(value, DUMP_TEXT_CHARS);
            debug!(
                %stage,
                field,
                chars = value.chars().count(),
                value = shown,
                "state"
            );
        }
    }

    if !record.search_results.is_empty() {
        debug!(
            %stage,
            field = "search_results",
            count = record.search_results.len(),
            "state"
        );
        for (i, result) in record.search_results.iter().enumerate() {
            debug!(
                %stage,
                index = i,
                chars = result.chars().count(),
                preview = %preview(result, DUMP_RESULT_CHARS),
                "search result"
            );
        }
    }

    if let Some(error) = &record.error {
        debug!(
            %stage,
            error_stage = %error.stage,
            kind = ?error.kind,
            message = %error.message,
            "state"
        );
    }
}
