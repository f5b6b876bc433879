//! Frame assembly.
//!
//! Runs the image-assembly program (ImageMagick `convert` by default) over
//! the workspace's frame glob. The assembler writes inside the workspace;
//! the finished file is moved to the output path only once it succeeded,
//! so an interrupted run never touches what is already there.
//!
//! Every argument is its own token and optional pieces are left out rather
//! than emitted empty: a stray `""` argument can make `convert` hang.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use crate::configuration::JobOptions;
use crate::error::GifflerError;
use crate::process::{self, ProcessFailure};
use crate::program::Program;
use crate::progress::CancellationToken;
use crate::workspace::Workspace;

/// Build the assembler's argument list.
///
/// Order: optional `-limit memory <N>MiB`, `-delay`, `-loop`, the frame
/// glob, `-dither`, `-fuzz`, `-coalesce`, `-layers optimize`, and the
/// in-workspace destination from [`Workspace::assembly_output`].
pub fn assembler_arguments(options: &JobOptions, workspace: &Workspace) -> Vec<OsString> {
    let mut arguments: Vec<OsString> = Vec::with_capacity(16);

    if let Some(mebibytes) = options.memory_limit() {
        arguments.extend(["-limit", "memory"].map(OsString::from));
        arguments.push(format!("{mebibytes}MiB").into());
    }

    arguments.push("-delay".into());
    arguments.push(options.frame_delay().to_string().into());
    arguments.push("-loop".into());
    arguments.push(options.loops().to_string().into());
    arguments.push(workspace.frame_glob().into_os_string());
    arguments.push("-dither".into());
    arguments.push(options.dither().as_argument().into());
    arguments.push("-fuzz".into());
    arguments.push(format!("{}%", options.fuzz()).into());
    arguments.push("-coalesce".into());
    arguments.extend(["-layers", "optimize"].map(OsString::from));
    arguments.push(
        workspace
            .assembly_output(&options.output_path())
            .into_os_string(),
    );

    debug_assert!(arguments.iter().all(|argument| !argument.is_empty()));
    arguments
}

/// Assemble the workspace's frames and move the result to the configured
/// output path.
///
/// On failure or interrupt the output path is left as it was.
pub fn assemble_gif(
    options: &JobOptions,
    workspace: &Workspace,
    cancellation: Option<&CancellationToken>,
) -> Result<(), GifflerError> {
    let program = Program::FrameAssembler.resolve(options.assembler_program.as_deref());
    let arguments = assembler_arguments(options, workspace);

    match process::run(&program, &arguments, cancellation) {
        Ok(()) => {}
        Err(ProcessFailure::Cancelled) => return Err(GifflerError::Cancelled),
        Err(failure) => {
            return Err(GifflerError::Assembly(format!(
                "{}: {failure}",
                program.display()
            )));
        }
    }

    let output = options.output_path();
    publish(&workspace.assembly_output(&output), &output)
}

/// Move `staged` to `output`, copying when a rename is not possible (for
/// example across filesystems).
fn publish(staged: &Path, output: &Path) -> Result<(), GifflerError> {
    let Err(error) = fs::rename(staged, output) else {
        return Ok(());
    };
    log::debug!(
        "Rename {} -> {} failed ({error}), copying instead",
        staged.display(),
        output.display()
    );

    fs::copy(staged, output).map_err(|source| GifflerError::Output {
        path: output.to_path_buf(),
        source,
    })?;
    if let Err(error) = fs::remove_file(staged) {
        log::warn!("Could not remove {}: {error}", staged.display());
    }
    Ok(())
}
