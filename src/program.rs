//! External program resolution.
//!
//! Both external tools are found the same way: an explicit path from
//! [`JobOptions`](crate::JobOptions) wins, then an environment override,
//! then a per-OS lookup table that falls back to the generic executable name
//! resolved from `PATH`.

use std::env;
use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Directory, next to the running binary, holding bundled Windows tools.
const BUNDLED_DIRECTORY: &str = "libs";

/// The two external collaborators of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Program {
    /// Writes numbered PNG frames from a video (`ffmpeg`).
    FrameExtractor,
    /// Combines numbered frames into one animated image (`convert`).
    FrameAssembler,
}

impl Program {
    /// Executable name looked up on `PATH` when nothing more specific applies.
    pub fn generic_name(self) -> &'static str {
        match self {
            Program::FrameExtractor => "ffmpeg",
            Program::FrameAssembler => "convert",
        }
    }

    /// Environment variable that overrides the lookup table.
    pub fn environment_variable(self) -> &'static str {
        match self {
            Program::FrameExtractor => "GIFFLER_FFMPEG",
            Program::FrameAssembler => "GIFFLER_CONVERT",
        }
    }

    fn bundled_file_name(self) -> &'static str {
        match self {
            Program::FrameExtractor => "ffmpeg.exe",
            Program::FrameAssembler => "convert.exe",
        }
    }

    /// Look the program up for operating system `os` (as in
    /// [`std::env::consts::OS`]).
    ///
    /// `binary_directory` is the directory of the running executable; on
    /// Windows the tools ship in a `libs` folder beside it.
    pub fn lookup(self, os: &str, binary_directory: Option<&Path>) -> PathBuf {
        match (os, binary_directory) {
            ("windows", Some(directory)) => directory
                .join(BUNDLED_DIRECTORY)
                .join(self.bundled_file_name()),
            _ => PathBuf::from(self.generic_name()),
        }
    }

    /// Resolve the executable to run.
    pub fn resolve(self, explicit: Option<&Path>) -> PathBuf {
        self.resolve_with(explicit, env::var_os(self.environment_variable()))
    }

    fn resolve_with(self, explicit: Option<&Path>, environment: Option<OsString>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(value) = environment.filter(|value| !value.is_empty()) {
            return PathBuf::from(value);
        }
        let binary_directory = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        self.lookup(env::consts::OS, binary_directory.as_deref())
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.generic_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_uses_bundled_binaries() {
        let directory = Path::new("C:/tools/giffler");
        assert_eq!(
            Program::FrameExtractor.lookup("windows", Some(directory)),
            directory.join("libs").join("ffmpeg.exe"),
        );
        assert_eq!(
            Program::FrameAssembler.lookup("windows", Some(directory)),
            directory.join("libs").join("convert.exe"),
        );
    }

    #[test]
    fn other_platforms_fall_back_to_generic_names() {
        for os in ["linux", "macos", "freebsd"] {
            assert_eq!(Program::FrameExtractor.lookup(os, None), PathBuf::from("ffmpeg"));
            assert_eq!(
                Program::FrameAssembler.lookup(os, Some(Path::new("/opt"))),
                PathBuf::from("convert"),
            );
        }
    }

    #[test]
    fn explicit_path_beats_environment() {
        let resolved = Program::FrameExtractor.resolve_with(
            Some(Path::new("/usr/local/bin/ffmpeg")),
            Some(OsString::from("/elsewhere/ffmpeg")),
        );
        assert_eq!(resolved, PathBuf::from("/usr/local/bin/ffmpeg"));
    }

    #[test]
    fn environment_beats_table_unless_empty() {
        let resolved = Program::FrameAssembler
            .resolve_with(None, Some(OsString::from("/opt/im/magick-convert")));
        assert_eq!(resolved, PathBuf::from("/opt/im/magick-convert"));

        let resolved = Program::FrameAssembler.resolve_with(None, Some(OsString::new()));
        assert_eq!(
            resolved,
            Program::FrameAssembler.lookup(
                env::consts::OS,
                env::current_exe().ok().as_deref().and_then(Path::parent),
            ),
        );
    }
}
