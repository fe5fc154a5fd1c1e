pub mod cli;
mod path;
#[cfg(all(test, unix))]
pub(crate) mod stub;

pub use self::path::*;

use crate::env::Env;
use once_cell_regex::exports::regex::{Captures, Regex};
use std::{
    ffi::OsStr,
    fmt::Display,
    io,
    path::{Path, PathBuf},
    process::ExitStatus,
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn list_display(list: &[impl Display]) -> String {
    if list.len() == 1 {
        list[0].to_string()
    } else if list.len() == 2 {
        format!("{} and {}", list[0], list[1])
    } else {
        let mut display = String::new();
        for (idx, item) in list.iter().enumerate() {
            let formatted = if idx + 1 == list.len() {
                // this is the last item
                format!("and {}", item)
            } else {
                format!("{}, ", item)
            };
            display.push_str(&formatted);
        }
        display
    }
}

/// Whether `name` is on the `PATH` that `env` hands to child processes.
pub fn command_present(name: &str, env: &Env) -> bool {
    match which::which_in(name, Some(env.path()), ".") {
        Ok(path) => {
            log::debug!("found `{}` at {:?}", name, path);
            true
        }
        Err(err) => {
            log::debug!("`{}` not found: {}", name, err);
            false
        }
    }
}

#[derive(Debug, Error)]
pub enum RunAndSearchError {
    #[error(transparent)]
    CommandFailed(#[from] std::io::Error),
    #[error("{command:?} output failed to match regex: {output:?}")]
    SearchFailed { command: String, output: String },
}

pub fn run_and_search<T>(
    command: &mut duct::Expression,
    re: &Regex,
    f: impl FnOnce(&str, Captures<'_>) -> T,
) -> Result<T, RunAndSearchError> {
    let command_string = format!("{command:?}");
    command
        .read()
        .map(|output| {
            re.captures(&output)
                .ok_or_else(|| RunAndSearchError::SearchFailed {
                    command: command_string,
                    output: output.to_owned(),
                })
                .map(|caps| f(&output, caps))
        })
        .map_err(RunAndSearchError::from)?
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start `{command}`: {source}")]
    StartFailed { command: String, source: io::Error },
    #[error("Failed to wait for `{command}`: {source}")]
    WaitFailed { command: String, source: io::Error },
    #[error("`{command}` exited with {status}:\n{output}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
    #[error("`{command}` didn't finish within {} seconds", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
    #[error("Failed to kill `{command}` after it timed out: {source}")]
    KillFailed { command: String, source: io::Error },
}

impl RunError {
    /// The combined stdout/stderr of a command that ran to completion.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}

/// Runs `expression` to completion with stdout and stderr captured together,
/// killing it if `timeout` elapses first. Returns the captured output.
pub fn run_captured(
    expression: duct::Expression,
    timeout: Option<Duration>,
) -> Result<String, RunError> {
    let command = format!("{:?}", expression);
    log::info!("running command: {}", command);
    let handle = expression
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked()
        .start()
        .map_err(|source| RunError::StartFailed {
            command: command.clone(),
            source,
        })?;
    let output = match timeout {
        None => handle.wait().map_err(|source| RunError::WaitFailed {
            command: command.clone(),
            source,
        })?,
        Some(timeout) => {
            let deadline = Instant::now() + timeout;
            loop {
                let finished = handle.try_wait().map_err(|source| RunError::WaitFailed {
                    command: command.clone(),
                    source,
                })?;
                if let Some(output) = finished {
                    break output;
                }
                if Instant::now() >= deadline {
                    log::warn!("killing `{}` after {:?}", command, timeout);
                    handle.kill().map_err(|source| RunError::KillFailed {
                        command: command.clone(),
                        source,
                    })?;
                    return Err(RunError::TimedOut { command, timeout });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };
    let text = String::from_utf8_lossy(&output.stdout).into_owned();
    log::debug!("output of `{}`:\n{}", command, text);
    if output.status.success() {
        Ok(text)
    } else {
        Err(RunError::Failed {
            command,
            status: output.status,
            output: text,
        })
    }
}

#[derive(Debug, Error)]
#[error("Failed to copy {src:?} to {dest:?}: {source}")]
pub struct CopyDirError {
    src: PathBuf,
    dest: PathBuf,
    source: RunError,
}

/// `cp -R`, which keeps the symlinks inside `.xcodeproj` bundles intact.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<(), CopyDirError> {
    run_captured(
        duct::cmd("cp", [OsStr::new("-R"), src.as_os_str(), dest.as_os_str()]),
        None,
    )
    .map(|_| ())
    .map_err(|source| CopyDirError {
        src: src.to_owned(),
        dest: dest.to_owned(),
        source,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest(
        list,
        expected,
        case(vec!["AFNetworking"], "AFNetworking"),
        case(vec!["AFNetworking", "SDWebImage"], "AFNetworking and SDWebImage"),
        case(vec!["A", "B", "C"], "A, B, and C")
    )]
    fn test_list_display(list: Vec<&str>, expected: &str) {
        assert_eq!(list_display(&list), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_present_uses_env_path() {
        let tools = stub::StubTools::new();
        assert!(command_present("xcodebuild", &tools.env()));
        let empty = tempfile::tempdir().unwrap();
        let env = Env::new()
            .unwrap()
            .with_path(empty.path().to_str().unwrap());
        assert!(!command_present("xcodebuild", &env));
        assert!(!command_present("sh", &env));
    }

    #[test]
    fn test_run_captured_collects_output() {
        let output = run_captured(duct::cmd("echo", ["hello"]), None).unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_run_captured_reports_failure_output() {
        let err = run_captured(
            duct::cmd("sh", ["-c", "echo '** ARCHIVE FAILED **' >&2; exit 65"]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Failed { .. }));
        assert_eq!(err.output().map(str::trim), Some("** ARCHIVE FAILED **"));
    }

    #[test]
    fn test_run_captured_times_out() {
        let err = run_captured(
            duct::cmd("sleep", ["30"]),
            Some(Duration::from_millis(100)),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::TimedOut { .. }));
    }
}
