//! Job configuration.
//!
//! [`JobOptions`] is the single immutable description of one conversion job.
//! It is built once from defaults overlaid with user-supplied values and then
//! passed by reference into every pipeline stage.
//!
//! # Example
//!
//! ```
//! use giffler::{DitherMode, JobOptions};
//!
//! let options = JobOptions::new("clip.mp4")
//!     .with_frames_per_second(15.0)
//!     .with_dither(DitherMode::FloydSteinberg)
//!     .with_memory_limit(512);
//!
//! assert_eq!(options.output_path().to_str(), Some("clip.mp4.gif"));
//! assert!(options.validate().is_ok());
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::GifflerError;

/// Default sampling rate, in frames per second.
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 30.0;
/// Default loop count. Zero loops forever.
pub const DEFAULT_LOOPS: u32 = 0;
/// Default color-similarity threshold, in percent.
pub const DEFAULT_FUZZ: f64 = 0.75;

const WORKSPACE_PREFIX: &str = "giffler-frames-";
const WORKSPACE_SUFFIX_LOW: u64 = 10_000_000_000;
const WORKSPACE_SUFFIX_HIGH: u64 = 100_000_000_000;

/// Error-diffusion mode handed to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    /// No dithering. This is the default.
    #[default]
    None,
    /// Floyd–Steinberg error diffusion.
    FloydSteinberg,
}

impl DitherMode {
    /// Interpret a `--dither` flag value.
    ///
    /// Any value enables Floyd–Steinberg except the explicit negatives
    /// `""`, `0`, `false`, `no`, `off`, and `none` (case-insensitive).
    pub fn from_flag_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" | "none" => DitherMode::None,
            _ => DitherMode::FloydSteinberg,
        }
    }

    /// The token passed after `-dither`.
    pub fn as_argument(self) -> &'static str {
        match self {
            DitherMode::None => "none",
            DitherMode::FloydSteinberg => "FloydSteinberg",
        }
    }
}

impl Display for DitherMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_argument())
    }
}

/// Resolved options for one video → GIF conversion.
///
/// Builder methods consume and return the value, so once a `JobOptions` is
/// handed to a [`Pipeline`](crate::Pipeline) it can no longer change.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    pub(crate) input: PathBuf,
    pub(crate) output: Option<PathBuf>,
    pub(crate) workspace: PathBuf,
    pub(crate) frames_per_second: f64,
    pub(crate) loops: u32,
    pub(crate) fuzz: f64,
    pub(crate) dither: DitherMode,
    pub(crate) memory_limit_mib: Option<u64>,
    pub(crate) extractor_program: Option<PathBuf>,
    pub(crate) assembler_program: Option<PathBuf>,
}

impl JobOptions {
    /// Create options for `input` with every other setting at its default
    /// and a freshly randomized workspace path.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            workspace: random_workspace_path(),
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            loops: DEFAULT_LOOPS,
            fuzz: DEFAULT_FUZZ,
            dither: DitherMode::None,
            memory_limit_mib: None,
            extractor_program: None,
            assembler_program: None,
        }
    }

    /// Set the destination artifact path.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Place the workspace at an explicit path instead of a random one
    /// under the OS temp directory.
    #[must_use]
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    /// Set how many frames are sampled per second of video.
    #[must_use]
    pub fn with_frames_per_second(mut self, frames_per_second: f64) -> Self {
        self.frames_per_second = frames_per_second;
        self
    }

    /// Set the animation loop count. `0` loops forever.
    #[must_use]
    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    /// Set the color-similarity threshold, in percent (0–100).
    ///
    /// Higher values merge more colors: smaller files, more artifacts.
    #[must_use]
    pub fn with_fuzz(mut self, fuzz: f64) -> Self {
        self.fuzz = fuzz;
        self
    }

    /// Set the dither mode.
    #[must_use]
    pub fn with_dither(mut self, dither: DitherMode) -> Self {
        self.dither = dither;
        self
    }

    /// Cap the assembler's memory use, in MiB.
    #[must_use]
    pub fn with_memory_limit(mut self, mebibytes: u64) -> Self {
        self.memory_limit_mib = Some(mebibytes);
        self
    }

    /// Use a specific frame-extraction executable instead of the platform
    /// lookup.
    #[must_use]
    pub fn with_extractor_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.extractor_program = Some(program.into());
        self
    }

    /// Use a specific frame-assembly executable instead of the platform
    /// lookup.
    #[must_use]
    pub fn with_assembler_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.assembler_program = Some(program.into());
        self
    }

    /// Source video path.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Destination path.
    ///
    /// Defaults to the input's file name with `.gif` appended, relative to
    /// the current directory (`videos/clip.mp4` → `clip.mp4.gif`).
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(output) => output.clone(),
            None => default_output_for(&self.input),
        }
    }

    /// Scratch directory for the frame sequence.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Frames sampled per second.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Animation loop count.
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Fuzz percentage.
    pub fn fuzz(&self) -> f64 {
        self.fuzz
    }

    /// Dither mode.
    pub fn dither(&self) -> DitherMode {
        self.dither
    }

    /// Memory limit in MiB, if any.
    pub fn memory_limit(&self) -> Option<u64> {
        self.memory_limit_mib
    }

    /// Per-frame delay in hundredths of a second: `100 / fps`.
    pub fn frame_delay(&self) -> f64 {
        100.0 / self.frames_per_second
    }

    /// Check that the options describe a runnable job.
    ///
    /// Runs before anything touches the disk.
    pub fn validate(&self) -> Result<(), GifflerError> {
        if self.input.as_os_str().is_empty() {
            return Err(GifflerError::configuration("Missing input, use --input"));
        }
        if !self.frames_per_second.is_finite() || self.frames_per_second <= 0.0 {
            return Err(GifflerError::configuration(format!(
                "--fps must be greater than zero (got {})",
                self.frames_per_second
            )));
        }
        if !(0.0..=100.0).contains(&self.fuzz) {
            return Err(GifflerError::configuration(format!(
                "--fuzz must be between 0 and 100 (got {})",
                self.fuzz
            )));
        }
        if self.memory_limit_mib == Some(0) {
            return Err(GifflerError::configuration(
                "--memory must be greater than zero",
            ));
        }
        if self.output.as_ref().is_some_and(|o| o.as_os_str().is_empty())
            || (self.output.is_none() && self.input.file_name().is_none())
        {
            return Err(GifflerError::configuration(format!(
                "cannot derive an output name from {}, use --output",
                self.input.display()
            )));
        }
        Ok(())
    }
}

/// `<input file name>.gif` in the current directory.
fn default_output_for(input: &Path) -> PathBuf {
    let mut name = input.file_name().unwrap_or_default().to_os_string();
    name.push(".gif");
    PathBuf::from(name)
}

/// A fresh `giffler-frames-<n>` path under the OS temp directory.
pub fn random_workspace_path() -> PathBuf {
    let suffix = rand::rng().random_range(WORKSPACE_SUFFIX_LOW..WORKSPACE_SUFFIX_HIGH);
    std::env::temp_dir().join(format!("{WORKSPACE_PREFIX}{suffix}"))
}
