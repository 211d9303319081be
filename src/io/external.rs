//! Bounded execution of command-line converters.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ConverterError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Lines of standard error quoted when a tool fails.
const STDERR_TAIL_LINES: usize = 5;

/// A program run with a time limit. Standard output is discarded; standard
/// error is kept to explain failures.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    timeout: Duration,
    install_hint: Option<String>,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            install_hint: None,
        }
    }

    /// Advice appended to the error when the program cannot be found.
    pub fn with_install_hint(mut self, hint: impl Into<String>) -> Self {
        self.install_hint = Some(hint.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the program with `args`. Every failure is reported as a
    /// file-processing error against `path`, the file being converted.
    pub fn run<I, S>(&self, args: I, path: &Path) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.program.display();
        let mut stderr = tempfile::tempfile()
            .map_err(|err| ConverterError::processing_with(path, "could not capture tool output", err))?;
        let stderr_handle = stderr
            .try_clone()
            .map_err(|err| ConverterError::processing_with(path, "could not capture tool output", err))?;

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_handle))
            .spawn()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    let message = match &self.install_hint {
                        Some(hint) => format!("'{program}' was not found; {hint}"),
                        None => format!("'{program}' was not found"),
                    };
                    ConverterError::processing(path, message)
                } else {
                    ConverterError::processing_with(path, &format!("could not start '{program}'"), err)
                }
            })?;
        debug!(%program, pid = child.id(), "started external tool");

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    return Err(ConverterError::processing_with(
                        path,
                        &format!("could not wait for '{program}'"),
                        err,
                    ));
                }
            }

            if started.elapsed() >= self.timeout {
                // The child may have exited between the poll and the kill.
                let _ = child.kill();
                let _ = child.wait();
                warn!(%program, timeout = ?self.timeout, "external tool timed out");
                return Err(ConverterError::processing(
                    path,
                    format!("'{program}' timed out after {:?}", self.timeout),
                ));
            }
            thread::sleep(POLL_INTERVAL);
        };

        debug!(%program, %status, elapsed = ?started.elapsed(), "external tool finished");
        if status.success() {
            return Ok(());
        }
        Err(ConverterError::processing(
            path,
            failure_message(&program.to_string(), status, &mut stderr),
        ))
    }
}

fn failure_message(program: &str, status: ExitStatus, stderr: &mut File) -> String {
    let mut output = String::new();
    let captured = stderr
        .seek(SeekFrom::Start(0))
        .and_then(|_| stderr.read_to_string(&mut output));
    if captured.is_err() {
        output.clear();
    }

    let lines: Vec<&str> = output.lines().filter(|line| !line.trim().is_empty()).collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    if tail.is_empty() {
        format!("'{program}' failed ({status})")
    } else {
        format!("'{program}' failed ({status}): {tail}")
    }
}
