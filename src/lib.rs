//! # giffler
//!
//! Turn a video into an animated GIF by orchestrating two external tools:
//! `ffmpeg` samples the video into numbered PNG frames inside a scratch
//! workspace, and ImageMagick's `convert` assembles those frames into the
//! final animation.
//!
//! The crate does no decoding or encoding of its own. What it provides is
//! the orchestration: a unique throwaway workspace, carefully tokenized
//! command lines, cooperative cancellation of the running child, and a
//! guarantee that the workspace is gone however the job ends.
//!
//! ## Quick Start
//!
//! ```no_run
//! use giffler::{JobOptions, Pipeline};
//!
//! let options = JobOptions::new("input.mp4");
//! let output = Pipeline::new(&options).run().unwrap();
//! assert_eq!(output.to_str(), Some("input.mp4.gif"));
//! ```
//!
//! ### Tuning the Output
//!
//! ```no_run
//! use giffler::{DitherMode, JobOptions, Pipeline};
//!
//! let options = JobOptions::new("input.mp4")
//!     .with_output("small.gif")
//!     .with_frames_per_second(12.0)
//!     .with_loops(1)
//!     .with_fuzz(3.0)
//!     .with_dither(DitherMode::FloydSteinberg)
//!     .with_memory_limit(512);
//!
//! Pipeline::new(&options).run().unwrap();
//! ```
//!
//! ## Requirements
//!
//! `ffmpeg` and ImageMagick `convert` must be on `PATH`, bundled under
//! `libs/` next to the binary on Windows, or named explicitly via
//! [`JobOptions::with_extractor_program`] /
//! [`JobOptions::with_assembler_program`] or the `GIFFLER_FFMPEG` /
//! `GIFFLER_CONVERT` environment variables.

pub mod assemble;
pub mod configuration;
pub mod error;
pub mod extract;
pub mod pipeline;
mod process;
pub mod program;
pub mod progress;
pub mod workspace;

pub use assemble::{assemble_gif, assembler_arguments};
pub use configuration::{DitherMode, JobOptions};
pub use error::GifflerError;
pub use extract::{extract_frames, extractor_arguments};
pub use pipeline::Pipeline;
pub use program::Program;
pub use progress::{CancellationToken, PipelineObserver, PipelineState, Stage};
pub use workspace::Workspace;
