//! Shell-script stand-ins for `ffmpeg` and `convert`.
//!
//! Each stub appends one line per invocation to a shared log so tests can
//! assert which programs ran, in what order, and with which arguments.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct Stubs {
    pub root: TempDir,
    pub log: PathBuf,
}

impl Stubs {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let log = root.path().join("invocations.log");
        Self { root, log }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    /// Writes `f0000001.png` and `f0000002.png` through the output pattern.
    pub fn succeeding_extractor(&self) -> PathBuf {
        self.script(
            "ffmpeg-ok",
            r#"echo "ffmpeg $*" >> "$LOG"
for arg; do last=$arg; done
printf x > "$(printf "$last" 1)" || exit 2
printf x > "$(printf "$last" 2)" || exit 2
"#,
        )
    }

    pub fn failing_extractor(&self) -> PathBuf {
        self.script(
            "ffmpeg-fail",
            r#"echo "ffmpeg $*" >> "$LOG"
echo "Invalid data found when processing input" >&2
exit 1
"#,
        )
    }

    /// Blocks until killed.
    pub fn hanging_extractor(&self) -> PathBuf {
        self.script(
            "ffmpeg-hang",
            r#"echo "ffmpeg $*" >> "$LOG"
exec sleep 30
"#,
        )
    }

    /// Logs how many frames its glob matched, then writes the output file.
    pub fn succeeding_assembler(&self) -> PathBuf {
        self.script(
            "convert-ok",
            r#"echo "convert $*" >> "$LOG"
for arg; do
  case "$arg" in
    *'/f*.png') echo "frames $(ls $arg | wc -l | tr -d ' ')" >> "$LOG" ;;
  esac
  last=$arg
done
printf 'GIF89a' > "$last"
"#,
        )
    }

    /// Starts writing its output, then blocks until killed.
    pub fn hanging_assembler(&self) -> PathBuf {
        self.script(
            "convert-hang",
            r#"echo "convert $*" >> "$LOG"
for arg; do last=$arg; done
printf 'GIF8' > "$last"
exec sleep 30
"#,
        )
    }

    pub fn failing_assembler(&self) -> PathBuf {
        self.script(
            "convert-fail",
            r#"echo "convert $*" >> "$LOG"
echo "convert: no images defined" >&2
exit 1
"#,
        )
    }

    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        let contents = format!(
            "#!/bin/sh\nLOG='{}'\n{body}",
            self.log.display()
        );
        fs::write(&path, contents).expect("Failed to write stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to mark stub executable");
        path
    }
}

/// Entries under `directory` whose name starts with `giffler-frames-`.
pub fn leftover_workspaces(directory: &Path) -> Vec<PathBuf> {
    fs::read_dir(directory)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|entry| {
                    entry
                        .file_name()
                        .to_string_lossy()
                        .starts_with("giffler-frames-")
                })
                .map(|entry| entry.path())
                .collect()
        })
        .unwrap_or_default()
}
