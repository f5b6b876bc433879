use std::{
    path::PathBuf,
    process,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::{CommandFactory, Parser};
use colored::Colorize;
use giffler::{
    CancellationToken, DitherMode, GifflerError, JobOptions, Pipeline, PipelineObserver,
    PipelineState, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};

const CLI_AFTER_HELP: &str = "\
Explained:
  --loops
      the number of times the gif should loop
      zero means infinite
  --fuzz
      number 0-100, representing a percentage
      colors near each other will be considered the same
      higher values cause more artifacts and lower file size
      recommended values are between 0.5 and 5
  --dither
      opposite of --fuzz but they can be used together
      sprinkles the image with dots
      helps with gradients and photographs
      increases file size
      absent parameter means it's off
      tip: keep a low fuzz when using dither or they cancel each other

Examples:
  giffler --input clip.mp4
  giffler --input clip.mp4 --output clip.gif --fps 15 --fuzz 2 --dither
  giffler --input clip.mp4 --memory 512 --progress --verbose";

#[derive(Debug, Parser)]
#[command(
    name = "giffler",
    version,
    about = "Turn a video into an animated GIF with ffmpeg and ImageMagick",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Source video path (required).
    #[arg(long, value_name = "FILENAME")]
    input: Option<PathBuf>,

    /// Destination path [default: <input file name>.gif].
    #[arg(long, value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Animation loop count, 0 loops forever.
    #[arg(long, default_value_t = 0)]
    loops: u32,

    /// Frames sampled per second of video.
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Color-similarity threshold percentage (0-100).
    #[arg(long, default_value_t = 0.75)]
    fuzz: f64,

    /// Enable Floyd-Steinberg dithering (any truthy value, or the bare flag).
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    dither: Option<String>,

    /// Memory limit for ImageMagick, in MiB.
    #[arg(long, value_name = "MIB")]
    memory: Option<u64>,

    /// Frame extraction executable [default: platform lookup, then `ffmpeg`].
    #[arg(long, value_name = "PATH")]
    ffmpeg: Option<PathBuf>,

    /// Frame assembly executable [default: platform lookup, then `convert`].
    #[arg(long, value_name = "PATH")]
    convert: Option<PathBuf>,

    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a spinner while each external program runs.
    #[arg(long)]
    progress: bool,
}

impl Cli {
    fn dither_mode(&self) -> DitherMode {
        self.dither
            .as_deref()
            .map_or(DitherMode::None, DitherMode::from_flag_value)
    }

    fn job_options(&self) -> Result<JobOptions, GifflerError> {
        let input = self
            .input
            .clone()
            .ok_or_else(|| GifflerError::Configuration("Missing input, use --input".into()))?;

        let mut options = JobOptions::new(input)
            .with_loops(self.loops)
            .with_frames_per_second(self.fps)
            .with_fuzz(self.fuzz)
            .with_dither(self.dither_mode());

        if let Some(output) = &self.output {
            options = options.with_output(output);
        }
        if let Some(memory) = self.memory {
            options = options.with_memory_limit(memory);
        }
        if let Some(program) = &self.ffmpeg {
            options = options.with_extractor_program(program);
        }
        if let Some(program) = &self.convert {
            options = options.with_assembler_program(program);
        }

        options.validate()?;
        Ok(options)
    }
}

/// Prints the progress trace, optionally with a spinner per stage.
struct TerminalProgress {
    spinner: Option<Mutex<Option<ProgressBar>>>,
}

impl TerminalProgress {
    fn new(show_spinner: bool) -> Self {
        Self {
            spinner: show_spinner.then(|| Mutex::new(None)),
        }
    }

    fn spinner_for(stage: Stage) -> ProgressBar {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(stage.message());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }
}

impl PipelineObserver for TerminalProgress {
    fn on_stage(&self, stage: Stage) {
        match &self.spinner {
            Some(slot) => {
                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(Self::spinner_for(stage));
                }
            }
            None => println!("{}", stage.message()),
        }
    }

    fn on_stage_complete(&self, stage: Stage) {
        if let Some(Ok(mut slot)) = self.spinner.as_ref().map(Mutex::lock) {
            if let Some(bar) = slot.take() {
                bar.finish_with_message(stage.message());
            }
        }
    }

    fn on_transition(&self, _from: PipelineState, to: PipelineState) {
        if to != PipelineState::Aborting {
            return;
        }
        if let Some(Ok(mut slot)) = self.spinner.as_ref().map(Mutex::lock) {
            if let Some(bar) = slot.take() {
                bar.abandon();
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

fn install_interrupt_handler(token: &CancellationToken) {
    let token = token.clone();
    let installed = ctrlc::set_handler(move || {
        if !token.is_cancelled() {
            eprintln!("{}", "Aborting giffler task...".yellow());
        }
        token.cancel();
    });
    if let Err(error) = installed {
        log::warn!("Could not install interrupt handler: {error}");
    }
}

fn run(cli: &Cli, token: &CancellationToken) -> Result<PathBuf, GifflerError> {
    let options = cli.job_options()?;
    Pipeline::new(&options)
        .with_observer(Arc::new(TerminalProgress::new(cli.progress)))
        .with_cancellation(token.clone())
        .run()
}

fn fail(error: &GifflerError) -> ! {
    eprintln!("{} {error}", "error:".red().bold());
    exit_with_help()
}

fn exit_with_help() -> ! {
    println!();
    let _ = Cli::command().print_help();
    process::exit(1);
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => error.exit(),
        Err(error) => {
            let _ = error.print();
            exit_with_help()
        }
    };

    init_logging(cli.verbose);

    let token = CancellationToken::new();
    install_interrupt_handler(&token);

    match run(&cli, &token) {
        Ok(output) => {
            log::debug!("Wrote {}", output.display());
            println!("{}", "Done!".green().bold());
        }
        Err(error) => fail(&error),
    }
}
