//! Frame extraction.
//!
//! Runs the frame-extraction program (`ffmpeg` by default) to sample the
//! input video at the configured rate into `f%07d.png` files inside the
//! workspace.

use std::ffi::OsString;

use crate::configuration::JobOptions;
use crate::error::GifflerError;
use crate::process::{self, ProcessFailure};
use crate::program::Program;
use crate::progress::CancellationToken;
use crate::workspace::Workspace;

/// Build the extractor's argument list:
/// `-i <input> -vf fps=<n> <workspace>/f%07d.png`.
pub fn extractor_arguments(options: &JobOptions, workspace: &Workspace) -> Vec<OsString> {
    vec![
        OsString::from("-i"),
        options.input().as_os_str().to_os_string(),
        OsString::from("-vf"),
        OsString::from(format!("fps={}", options.frames_per_second())),
        workspace.frame_pattern().into_os_string(),
    ]
}

/// Extract frames from the input into `workspace`.
///
/// An empty frame set is not reported here; it surfaces when the frames are
/// assembled.
pub fn extract_frames(
    options: &JobOptions,
    workspace: &Workspace,
    cancellation: Option<&CancellationToken>,
) -> Result<(), GifflerError> {
    let program = Program::FrameExtractor.resolve(options.extractor_program.as_deref());
    let arguments = extractor_arguments(options, workspace);

    process::run(&program, &arguments, cancellation).map_err(|failure| match failure {
        ProcessFailure::Cancelled => GifflerError::Cancelled,
        other => GifflerError::Extraction(format!("{}: {other}", program.display())),
    })?;

    log::debug!(
        "Extracted {} frame(s) into {}",
        workspace.frame_count(),
        workspace.path().display()
    );
    Ok(())
}
