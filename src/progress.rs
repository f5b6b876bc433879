//! Pipeline state reporting and cancellation support.
//!
//! This module provides [`PipelineObserver`] for watching a job move through
//! its [`PipelineState`]s, [`Stage`] for the steps that do visible work, and
//! [`CancellationToken`] for cooperative interruption.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use giffler::{
//!     CancellationToken, GifflerError, JobOptions, Pipeline, PipelineObserver, Stage,
//! };
//!
//! struct PrintStages;
//!
//! impl PipelineObserver for PrintStages {
//!     fn on_stage(&self, stage: Stage) {
//!         println!("{}", stage.message());
//!     }
//! }
//!
//! let options = JobOptions::new("input.mp4");
//! let token = CancellationToken::new();
//! Pipeline::new(&options)
//!     .with_observer(Arc::new(PrintStages))
//!     .with_cancellation(token)
//!     .run()?;
//! # Ok::<(), GifflerError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Lifecycle states of a single conversion job.
///
/// A job only ever moves forward along
/// `Idle → WorkspacePrepared → FramesExtracted → Assembled → CleanedUp`,
/// or sideways into [`Aborting`](PipelineState::Aborting) from any
/// non-terminal state. [`CleanedUp`](PipelineState::CleanedUp) is the only
/// terminal state and is reached on success and failure alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Configuration accepted, nothing touched on disk yet.
    Idle,
    /// The workspace exists and is empty.
    WorkspacePrepared,
    /// The extractor exited successfully.
    FramesExtracted,
    /// The assembler exited successfully.
    Assembled,
    /// A failure or interrupt is being unwound.
    Aborting,
    /// The workspace is gone. Terminal.
    CleanedUp,
}

impl PipelineState {
    /// Returns `true` for the terminal state.
    pub fn is_terminal(self) -> bool {
        self == PipelineState::CleanedUp
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::WorkspacePrepared => "workspace-prepared",
            PipelineState::FramesExtracted => "frames-extracted",
            PipelineState::Assembled => "assembled",
            PipelineState::Aborting => "aborting",
            PipelineState::CleanedUp => "cleaned-up",
        };
        f.write_str(name)
    }
}

/// A step of the pipeline that runs an external program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Running the frame extractor.
    ExtractFrames,
    /// Running the frame assembler.
    AssembleGif,
}

impl Stage {
    /// The progress line printed when the stage starts.
    pub fn message(self) -> &'static str {
        match self {
            Stage::ExtractFrames => "Extracting frames...",
            Stage::AssembleGif => "Making gif...",
        }
    }
}

/// Trait for receiving lifecycle updates from a [`Pipeline`](crate::Pipeline).
///
/// Implementations must be [`Send`] and [`Sync`] so a single observer can be
/// shared with an interrupt handler. Observers are infallible: they see the
/// job but cannot steer it. Use [`CancellationToken`] to stop a job.
pub trait PipelineObserver: Send + Sync {
    /// Called on every state change, including transitions into
    /// [`PipelineState::Aborting`].
    fn on_transition(&self, _from: PipelineState, _to: PipelineState) {}

    /// Called right before an external program is started.
    fn on_stage(&self, _stage: Stage) {}

    /// Called once the external program for `stage` has exited successfully.
    fn on_stage_complete(&self, _stage: Stage) {}
}

/// Discards every notification. The default when no observer is set.
pub(crate) struct NoOpObserver;

impl PipelineObserver for NoOpObserver {}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clone the token and hand one copy to a signal handler; calling
/// [`cancel`](CancellationToken::cancel) from there makes the running
/// pipeline kill its current child process, skip the remaining stages, and
/// clean up.
///
/// # Example
///
/// ```
/// use giffler::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// All clones of this token will observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cleaned_up_is_terminal() {
        assert!(PipelineState::CleanedUp.is_terminal());
        assert!(!PipelineState::Aborting.is_terminal());
        assert!(!PipelineState::Assembled.is_terminal());
    }

    #[test]
    fn stage_messages_match_progress_trace() {
        assert_eq!(Stage::ExtractFrames.message(), "Extracting frames...");
        assert_eq!(Stage::AssembleGif.message(), "Making gif...");
    }

    #[test]
    fn state_display_is_kebab_case() {
        assert_eq!(PipelineState::WorkspacePrepared.to_string(), "workspace-prepared");
        assert_eq!(PipelineState::CleanedUp.to_string(), "cleaned-up");
    }
}
