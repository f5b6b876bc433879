//! Blocking child-process execution with cooperative cancellation.
//!
//! Both invokers run their tool through [`run`]: the child is spawned with
//! stdin closed and stderr captured, then polled until it exits or the
//! [`CancellationToken`] fires. On cancellation the child is killed and
//! reaped before returning.

use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Error as IoError, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::progress::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 10;

/// Why a child process did not finish successfully.
#[derive(Debug)]
pub(crate) enum ProcessFailure {
    /// The executable could not be started.
    Spawn(IoError),
    /// Waiting on the child failed.
    Wait(IoError),
    /// The child ran and exited unsuccessfully.
    Exit {
        status: ExitStatus,
        stderr_tail: String,
    },
    /// The token fired while the child was running.
    Cancelled,
}

impl Display for ProcessFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessFailure::Spawn(error) => write!(f, "could not start: {error}"),
            ProcessFailure::Wait(error) => write!(f, "could not wait for exit: {error}"),
            ProcessFailure::Exit {
                status,
                stderr_tail,
            } if stderr_tail.is_empty() => write!(f, "{status}"),
            ProcessFailure::Exit {
                status,
                stderr_tail,
            } => write!(f, "{status}\n{stderr_tail}"),
            ProcessFailure::Cancelled => f.write_str("interrupted"),
        }
    }
}

/// Run `program` with `arguments` to completion.
///
/// Blocks with no timeout. Checks `cancellation` before spawning and every
/// poll interval while the child runs.
pub(crate) fn run(
    program: &Path,
    arguments: &[OsString],
    cancellation: Option<&CancellationToken>,
) -> Result<(), ProcessFailure> {
    let is_cancelled = || cancellation.is_some_and(CancellationToken::is_cancelled);

    if is_cancelled() {
        return Err(ProcessFailure::Cancelled);
    }

    log::debug!("Running {} {:?}", program.display(), arguments);

    let mut child = Command::new(program)
        .args(arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ProcessFailure::Spawn)?;

    let stderr_reader = spawn_stderr_reader(&mut child);

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(error) => {
                terminate(&mut child);
                return Err(ProcessFailure::Wait(error));
            }
        }

        if is_cancelled() {
            log::debug!("Cancellation requested, killing {}", program.display());
            terminate(&mut child);
            // A grandchild may still hold stderr open; leave the reader detached.
            drop(stderr_reader);
            return Err(ProcessFailure::Cancelled);
        }

        thread::sleep(POLL_INTERVAL);
    };

    let stderr_tail = stderr_reader
        .and_then(|reader| reader.join().ok())
        .unwrap_or_default();

    if status.success() {
        Ok(())
    } else if is_cancelled() {
        // The terminal's interrupt reaches the child too and may end it first.
        Err(ProcessFailure::Cancelled)
    } else {
        Err(ProcessFailure::Exit {
            status,
            stderr_tail,
        })
    }
}

/// Drain stderr on a helper thread so a chatty child never blocks on a full
/// pipe. Only the last [`STDERR_TAIL_LINES`] lines are kept.
fn spawn_stderr_reader(child: &mut Child) -> Option<JoinHandle<String>> {
    let stderr = child.stderr.take()?;
    Some(thread::spawn(move || read_tail(stderr, STDERR_TAIL_LINES)))
}

/// Best-effort kill and reap.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// The last `limit` non-blank lines of `reader`.
///
/// Carriage returns end a line too: `ffmpeg` redraws its progress line
/// with `\r` and never emits `\n` for it.
fn read_tail(reader: impl Read, limit: usize) -> String {
    let mut reader = BufReader::new(reader);
    let mut kept: VecDeque<String> = VecDeque::with_capacity(limit + 1);
    let mut line = Vec::new();

    let mut keep = |line: &mut Vec<u8>| {
        if !line.trim_ascii().is_empty() {
            kept.push_back(String::from_utf8_lossy(line).into_owned());
            if kept.len() > limit {
                kept.pop_front();
            }
        }
        line.clear();
    };

    loop {
        let buffer = match reader.fill_buf() {
            Ok([]) => break,
            Ok(buffer) => buffer,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        for &byte in buffer {
            match byte {
                b'\n' | b'\r' => keep(&mut line),
                _ => line.push(byte),
            }
        }
        let consumed = buffer.len();
        reader.consume(consumed);
    }
    keep(&mut line);

    Vec::from(kept).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_last_non_blank_lines() {
        let text = "one\n\ntwo\nthree\n  \nfour\n";
        assert_eq!(read_tail(text.as_bytes(), 2), "three\nfour");
        assert_eq!(read_tail(text.as_bytes(), 10), "one\ntwo\nthree\nfour");
        assert_eq!(read_tail(&b""[..], 3), "");
    }

    #[test]
    fn tail_splits_progress_redraws_and_stays_bounded() {
        let mut text = String::new();
        for frame in 0..10_000 {
            text.push_str(&format!("frame={frame}\r"));
        }
        text.push_str("Conversion failed!");

        let tail = read_tail(text.as_bytes(), 3);
        assert_eq!(tail, "frame=9998\nframe=9999\nConversion failed!");
    }

    #[test]
    fn missing_executable_is_a_spawn_failure() {
        let result = run(Path::new("/definitely/not/a/real/program"), &[], None);
        assert!(matches!(result, Err(ProcessFailure::Spawn(_))));
    }

    #[test]
    fn pre_cancelled_token_never_spawns() {
        let token = CancellationToken::new();
        token.cancel();
        let result = run(Path::new("/definitely/not/a/real/program"), &[], Some(&token));
        assert!(matches!(result, Err(ProcessFailure::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_stderr_tail() {
        let arguments = ["-c", "echo boom >&2; exit 3"].map(OsString::from);
        let failure = run(Path::new("/bin/sh"), &arguments, None).unwrap_err();
        match failure {
            ProcessFailure::Exit { status, stderr_tail } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr_tail, "boom");
            }
            other => panic!("Expected Exit, got: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn cancellation_kills_a_running_child() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            canceller.cancel();
        });

        let arguments = ["-c", "exec sleep 30"].map(OsString::from);
        let started = std::time::Instant::now();
        let result = run(Path::new("/bin/sh"), &arguments, Some(&token));
        handle.join().unwrap();

        assert!(matches!(result, Err(ProcessFailure::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn failure_after_cancellation_counts_as_cancelled() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });

        let arguments = ["-c", "sleep 1; exit 130"].map(OsString::from);
        let result = run(Path::new("/bin/sh"), &arguments, Some(&token));
        handle.join().unwrap();

        assert!(matches!(result, Err(ProcessFailure::Cancelled)));
    }
}
