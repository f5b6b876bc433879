//! The lifecycle controller.
//!
//! [`Pipeline`] drives one job through
//! `Idle → WorkspacePrepared → FramesExtracted → Assembled → CleanedUp`.
//! Any failure or interrupt diverts it through `Aborting`, and every path
//! ends in `CleanedUp` with the workspace removed.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;

use crate::assemble::assemble_gif;
use crate::configuration::JobOptions;
use crate::error::GifflerError;
use crate::extract::extract_frames;
use crate::progress::{CancellationToken, NoOpObserver, PipelineObserver, PipelineState, Stage};
use crate::workspace::{self, Workspace};

/// Runs one conversion job to completion.
///
/// # Example
///
/// ```no_run
/// use giffler::{GifflerError, JobOptions, Pipeline};
///
/// let options = JobOptions::new("input.mp4").with_frames_per_second(15.0);
/// let output = Pipeline::new(&options).run()?;
/// println!("wrote {}", output.display());
/// # Ok::<(), GifflerError>(())
/// ```
pub struct Pipeline<'a> {
    options: &'a JobOptions,
    observer: Arc<dyn PipelineObserver>,
    cancellation: Option<CancellationToken>,
    state: PipelineState,
    workspace: Option<Workspace>,
}

impl Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline for `options`, in the [`Idle`](PipelineState::Idle)
    /// state.
    pub fn new(options: &'a JobOptions) -> Self {
        Self {
            options,
            observer: Arc::new(NoOpObserver),
            cancellation: None,
            state: PipelineState::Idle,
            workspace: None,
        }
    }

    /// Attach an observer for state transitions and stage starts.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token fires, the running child is killed, remaining stages
    /// are skipped, and [`run`](Pipeline::run) returns
    /// [`GifflerError::Cancelled`] after cleaning up.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the job and return the path of the written animation.
    ///
    /// # Errors
    ///
    /// Returns [`GifflerError::Configuration`] without touching the disk when
    /// the options are invalid. Every other error is returned only after the
    /// workspace has been removed.
    pub fn run(mut self) -> Result<PathBuf, GifflerError> {
        self.options.validate()?;

        log::debug!(
            "Converting {} -> {} (workspace {})",
            self.options.input().display(),
            self.options.output_path().display(),
            self.options.workspace().display(),
        );

        let outcome = self.run_stages();
        if let Err(error) = &outcome {
            log::debug!("Aborting from {}: {error}", self.state);
            self.transition(PipelineState::Aborting);
        }

        self.clean_up();
        self.transition(PipelineState::CleanedUp);
        debug_assert!(self.state.is_terminal());
        outcome
    }

    fn run_stages(&mut self) -> Result<PathBuf, GifflerError> {
        self.check_cancelled()?;
        let workspace = Workspace::prepare(self.options.workspace())?;
        self.transition(PipelineState::WorkspacePrepared);

        let outcome = self.run_stages_in(&workspace);
        self.workspace = Some(workspace);
        outcome
    }

    fn run_stages_in(&mut self, workspace: &Workspace) -> Result<PathBuf, GifflerError> {
        self.run_stage(Stage::ExtractFrames, workspace)?;
        self.transition(PipelineState::FramesExtracted);

        self.run_stage(Stage::AssembleGif, workspace)?;
        self.transition(PipelineState::Assembled);

        Ok(self.options.output_path())
    }

    fn run_stage(&self, stage: Stage, workspace: &Workspace) -> Result<(), GifflerError> {
        self.check_cancelled()?;
        let cancellation = self.cancellation.as_ref();

        self.observer.on_stage(stage);
        match stage {
            Stage::ExtractFrames => extract_frames(self.options, workspace, cancellation)?,
            Stage::AssembleGif => assemble_gif(self.options, workspace, cancellation)?,
        }
        self.observer.on_stage_complete(stage);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), GifflerError> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(GifflerError::Cancelled);
        }
        Ok(())
    }

    /// Remove the workspace. Failures are logged, never returned.
    fn clean_up(&mut self) {
        let result = match self.workspace.take() {
            Some(workspace) => workspace.destroy(),
            None => workspace::destroy(self.options.workspace()),
        };
        if let Err(error) = result {
            log::warn!("{error}");
        }
    }

    fn transition(&mut self, to: PipelineState) {
        let from = self.state;
        debug_assert!(!from.is_terminal(), "no transition out of {from}");
        log::debug!("Pipeline {from} -> {to}");
        self.state = to;
        self.observer.on_transition(from, to);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        transitions: Mutex<Vec<(PipelineState, PipelineState)>>,
    }

    impl PipelineObserver for Recorder {
        fn on_transition(&self, from: PipelineState, to: PipelineState) {
            self.transitions.lock().unwrap().push((from, to));
        }
    }

    #[test]
    fn missing_input_fails_before_any_transition() {
        let root = tempfile::tempdir().unwrap();
        let options = JobOptions::new("").with_workspace(root.path().join("job"));
        let recorder = Arc::new(Recorder::default());

        let error = Pipeline::new(&options)
            .with_observer(recorder.clone())
            .run()
            .unwrap_err();

        assert!(matches!(error, GifflerError::Configuration(_)));
        assert!(recorder.transitions.lock().unwrap().is_empty());
        assert!(!root.path().join("job").exists());
    }

    #[test]
    fn cancelled_before_start_aborts_from_idle() {
        let root = tempfile::tempdir().unwrap();
        let options = JobOptions::new("clip.mp4").with_workspace(root.path().join("job"));
        let recorder = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        token.cancel();

        let error = Pipeline::new(&options)
            .with_observer(recorder.clone())
            .with_cancellation(token)
            .run()
            .unwrap_err();

        assert!(error.is_cancelled());
        assert_eq!(
            *recorder.transitions.lock().unwrap(),
            vec![
                (PipelineState::Idle, PipelineState::Aborting),
                (PipelineState::Aborting, PipelineState::CleanedUp),
            ],
        );
        assert!(!root.path().join("job").exists());
    }

    #[test]
    fn unspawnable_extractor_aborts_after_workspace() {
        let root = tempfile::tempdir().unwrap();
        let workspace = root.path().join("job");
        let options = JobOptions::new("clip.mp4")
            .with_workspace(&workspace)
            .with_extractor_program(root.path().join("missing-ffmpeg"));
        let recorder = Arc::new(Recorder::default());

        let error = Pipeline::new(&options)
            .with_observer(recorder.clone())
            .run()
            .unwrap_err();

        assert!(matches!(error, GifflerError::Extraction(_)));
        let states: Vec<PipelineState> = recorder
            .transitions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, to)| *to)
            .collect();
        assert_eq!(
            states,
            vec![
                PipelineState::WorkspacePrepared,
                PipelineState::Aborting,
                PipelineState::CleanedUp,
            ],
        );
        assert!(!workspace.exists());
    }

    #[test]
    fn only_the_last_transition_reaches_a_terminal_state() {
        let root = tempfile::tempdir().unwrap();
        let options = JobOptions::new("clip.mp4")
            .with_workspace(root.path().join("job"))
            .with_extractor_program(root.path().join("missing-ffmpeg"));
        let recorder = Arc::new(Recorder::default());

        Pipeline::new(&options)
            .with_observer(recorder.clone())
            .run()
            .unwrap_err();

        let transitions = recorder.transitions.lock().unwrap();
        let (last, earlier) = transitions.split_last().unwrap();
        assert!(last.1.is_terminal());
        assert!(earlier.iter().all(|(from, to)| !from.is_terminal() && !to.is_terminal()));
    }

    #[test]
    fn workspace_error_when_parent_is_missing() {
        let root = tempfile::tempdir().unwrap();
        let options =
            JobOptions::new("clip.mp4").with_workspace(root.path().join("gone").join("job"));

        let error = Pipeline::new(&options).run().unwrap_err();
        assert!(matches!(error, GifflerError::Workspace { .. }));
    }

    #[test]
    fn debug_hides_observer() {
        let options = JobOptions::new("clip.mp4");
        let debug = format!("{:?}", Pipeline::new(&options));
        assert!(debug.contains("Pipeline"));
        assert!(debug.contains("has_cancellation: false"));
        assert!(debug.contains("state: Idle"));
    }
}
