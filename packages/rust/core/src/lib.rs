//! Pipeline orchestration for lyricsmith.
//!
//! This crate holds the stage graph and its driver ([`workflow`]), the
//! individual stage functions ([`stages`]), and the context object that
//! injects external capabilities into them ([`context`]).

pub mod context;
pub mod stages;
pub mod text;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Capabilities, WorkflowConfig};
pub use workflow::{
    EndReason, ProgressReporter, SilentProgress, Transition, Workflow, next_stage,
};
