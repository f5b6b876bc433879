//! Scratch directory management.
//!
//! A [`Workspace`] owns the directory the extractor writes frames into and
//! the assembler reads them back from. [`ensure_clean`] and [`destroy`] are
//! the underlying operations; both are safe to call any number of times.

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::GifflerError;

/// File-name pattern the extractor writes frames with.
pub const FRAME_PATTERN: &str = "f%07d.png";
/// Glob the assembler reads frames back with.
pub const FRAME_GLOB: &str = "f*.png";

/// Remove whatever is at `path`, then create a fresh empty directory there.
pub fn ensure_clean(path: &Path) -> Result<(), GifflerError> {
    destroy(path)?;
    fs::create_dir(path).map_err(|source| GifflerError::Workspace {
        path: path.to_path_buf(),
        source,
    })
}

/// Remove the directory at `path` and everything in it.
///
/// Succeeds silently when nothing is there.
pub fn destroy(path: &Path) -> Result<(), GifflerError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(GifflerError::Workspace {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// An exclusively owned scratch directory for one job.
///
/// The directory is removed by [`destroy`](Workspace::destroy) and, failing
/// that, when the value is dropped.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Clear out any leftover directory at `path` and create an empty one.
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self, GifflerError> {
        let path = path.into();
        ensure_clean(&path)?;
        log::debug!("Prepared workspace {}", path.display());
        Ok(Self { path })
    }

    /// The workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the extractor should write frames.
    pub fn frame_pattern(&self) -> PathBuf {
        self.path.join(FRAME_PATTERN)
    }

    /// What the assembler should read.
    pub fn frame_glob(&self) -> PathBuf {
        self.path.join(FRAME_GLOB)
    }

    /// Where the assembler writes before the result is moved to `output`.
    ///
    /// Keeps the extension of `output` so the assembler picks the same
    /// format, and never matches [`FRAME_GLOB`].
    pub fn assembly_output(&self, output: &Path) -> PathBuf {
        let extension = output
            .extension()
            .filter(|extension| !extension.is_empty())
            .unwrap_or_else(|| OsStr::new("gif"));
        self.path.join("output").with_extension(extension)
    }

    /// Number of extracted frame files currently in the workspace.
    ///
    /// Used for diagnostics only; an empty workspace is not an error.
    pub fn frame_count(&self) -> usize {
        fs::read_dir(&self.path)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .filter(|entry| is_frame_file(&entry.file_name().to_string_lossy()))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Remove the directory. Calling this again is a no-op.
    pub fn destroy(&self) -> Result<(), GifflerError> {
        destroy(&self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(error) = self.destroy() {
            log::warn!("{error}");
        }
    }
}

fn is_frame_file(name: &str) -> bool {
    name.strip_prefix('f')
        .and_then(|rest| rest.strip_suffix(".png"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
