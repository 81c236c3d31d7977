//! External command execution with timeout and retry.
//!
//! Every provider CLI call, discovery and probes alike, goes through
//! [`CommandRunner`], which owns:
//!
//! - per-command timeout with SIGTERM → SIGKILL escalation
//! - output size caps to prevent memory exhaustion
//! - the uniform retry policy (spawn failures, non-zero exits, and
//!   timeouts consume an attempt; decode failures happen after the runner
//!   and are never retried)
//!
//! The child inherits the parent environment (provider CLIs read
//! credentials from `HOME`, `AWS_PROFILE`, and friends) but the locale is
//! pinned to C so output is parse-stable.

use cc_config::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default maximum captured output size in bytes (10MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

/// Captured output kept on exec errors, for logs and error columns.
const ERROR_CONTEXT_BYTES: usize = 4096;

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("command timed out after {after:?}")]
    Timeout { after: Duration, output: String },

    #[error("command exited with status {code}")]
    NonZeroExit { code: i32, output: String },

    #[error("command killed by signal")]
    Killed { output: String },

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Output captured from the failing invocation, when any was.
    pub fn context_output(&self) -> Option<&str> {
        match self {
            ExecError::Timeout { output, .. }
            | ExecError::NonZeroExit { output, .. }
            | ExecError::Killed { output } => Some(output),
            _ => None,
        }
    }
}

/// One external command invocation, argv form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Rendered command line for logs and error context.
    pub fn rendered(&self) -> String {
        let mut parts = Vec::with_capacity(1 + self.args.len());
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered())
    }
}

/// Output from a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output, lossy UTF-8 (may be truncated).
    pub stdout: String,

    /// Standard error, lossy UTF-8 (may be truncated).
    pub stderr: String,

    /// Whether either stream hit the size cap.
    pub truncated: bool,

    /// Execution duration of the successful attempt.
    pub duration: Duration,
}

/// Configuration for the command runner.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Per-command timeout; `None` disables it.
    pub timeout: Option<Duration>,

    /// Maximum captured bytes per stream.
    pub max_output_bytes: usize,

    /// Retry policy applied to every call.
    pub retry: RetryPolicy,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            retry: RetryPolicy::default(),
        }
    }
}

/// Sequential runner for provider CLI commands.
#[derive(Debug)]
pub struct CommandRunner {
    config: ExecConfig,
}

impl CommandRunner {
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ExecConfig::default())
    }

    /// Run a command under the retry policy.
    ///
    /// The last error is returned once attempts are exhausted; a success
    /// stops the attempt loop early.
    pub fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.run_once(spec) {
                Ok(output) => return Ok(output),
                Err(err) if attempt < attempts => {
                    warn!(
                        command = %spec,
                        attempt,
                        error = %err,
                        "command attempt failed, retrying"
                    );
                    thread::sleep(self.config.retry.backoff());
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn run_once(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        validate_program(&spec.program)?;

        debug!(command = %spec, timeout = ?self.config.timeout, "running command");
        let start = Instant::now();

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExecError::CommandNotFound(spec.program.clone()),
                _ => ExecError::SpawnFailed(e.to_string()),
            })?;

        let (stdout, stderr, status, truncated, timed_out) = self.capture(&mut child)?;
        let duration = start.elapsed();

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if timed_out {
            return Err(ExecError::Timeout {
                after: self.config.timeout.unwrap_or_default(),
                output: error_context(&stdout, &stderr),
            });
        }

        match status {
            Some(0) => {
                trace!(command = %spec, ?duration, "command complete");
                Ok(CommandOutput {
                    stdout,
                    stderr,
                    truncated,
                    duration,
                })
            }
            Some(code) => Err(ExecError::NonZeroExit {
                code,
                output: error_context(&stdout, &stderr),
            }),
            None => Err(ExecError::Killed {
                output: error_context(&stdout, &stderr),
            }),
        }
    }

    /// Read both streams until the child exits or the deadline passes.
    #[allow(clippy::type_complexity)]
    fn capture(
        &self,
        child: &mut Child,
    ) -> Result<(Vec<u8>, Vec<u8>, Option<i32>, bool, bool), ExecError> {
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let max_output = self.config.max_output_bytes;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let mut truncated = false;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let mut chunk = vec![0u8; 8192];

        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!("command timed out, escalating SIGTERM -> SIGKILL");
                kill_with_grace(child);
                let _ = child.wait();
                return Ok((stdout_buf, stderr_buf, None, truncated, true));
            }

            let mut did_read = false;
            if let Some(ref mut out) = stdout {
                let n = try_read_nonblocking(out, &mut chunk)?;
                if n > 0 {
                    did_read = true;
                    append_capped(&mut stdout_buf, &chunk[..n], max_output, &mut truncated);
                }
            }
            if let Some(ref mut err) = stderr {
                let n = try_read_nonblocking(err, &mut chunk)?;
                if n > 0 {
                    did_read = true;
                    append_capped(&mut stderr_buf, &chunk[..n], max_output, &mut truncated);
                }
            }

            match child.try_wait()? {
                Some(status) => {
                    if let Some(ref mut out) = stdout {
                        drain_capped(out, &mut stdout_buf, max_output, &mut truncated)?;
                    }
                    if let Some(ref mut err) = stderr {
                        drain_capped(err, &mut stderr_buf, max_output, &mut truncated)?;
                    }
                    return Ok((stdout_buf, stderr_buf, status.code(), truncated, false));
                }
                None if !did_read => thread::sleep(Duration::from_millis(10)),
                None => {}
            }
        }
    }
}

/// Reject program names with shell metacharacters; commands are built
/// internally but the provider name and extra args flow in from the CLI.
fn validate_program(program: &str) -> Result<(), ExecError> {
    if program.is_empty() {
        return Err(ExecError::InvalidCommand("empty program name".to_string()));
    }
    if program.contains(['|', '&', ';', '$', '`', '\n', '\r']) {
        return Err(ExecError::InvalidCommand(format!(
            "program contains shell metacharacters: {}",
            program
        )));
    }
    Ok(())
}

fn append_capped(buf: &mut Vec<u8>, data: &[u8], max: usize, truncated: &mut bool) {
    let space = max.saturating_sub(buf.len());
    if space >= data.len() {
        buf.extend_from_slice(data);
    } else {
        buf.extend_from_slice(&data[..space]);
        *truncated = true;
    }
}

/// Drain what is immediately available from a stream after child exit.
///
/// Non-blocking reads only: a grandchild may still hold the pipe open.
fn drain_capped<R: Read + AsRawFdCompat>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; 8192];
    loop {
        if *truncated {
            return Ok(());
        }
        match try_read_nonblocking(stream, &mut chunk)? {
            0 => return Ok(()),
            n => append_capped(buf, &chunk[..n], max, truncated),
        }
    }
}

/// Kill a process with SIGTERM, then SIGKILL after a grace period.
#[cfg(unix)]
fn kill_with_grace(child: &mut Child) {
    let pid = child.id() as i32;

    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    thread::sleep(Duration::from_millis(SIGTERM_GRACE_MS));

    match child.try_wait() {
        Ok(Some(_)) => {}
        _ => {
            warn!(pid, "process survived SIGTERM, sending SIGKILL");
            unsafe {
                libc::kill(pid, libc::SIGKILL);
            }
        }
    }
}

#[cfg(not(unix))]
fn kill_with_grace(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(unix)]
use std::os::unix::io::AsRawFd as AsRawFdCompat;

#[cfg(not(unix))]
trait AsRawFdCompat {}
#[cfg(not(unix))]
impl<T> AsRawFdCompat for T {}

/// Try to read from a stream without blocking.
///
/// Sets O_NONBLOCK around the read and restores the original flags;
/// EAGAIN/EWOULDBLOCK is reported as `Ok(0)`.
#[cfg(unix)]
fn try_read_nonblocking<R: Read + AsRawFdCompat>(
    stream: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = stream.read(buf);

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn try_read_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    stream.read(buf)
}

/// Merge both streams into the short context string kept on errors.
fn error_context(stdout: &str, stderr: &str) -> String {
    let mut merged = String::new();
    if !stderr.trim().is_empty() {
        merged.push_str(stderr.trim());
    }
    if !stdout.trim().is_empty() {
        if !merged.is_empty() {
            merged.push('\n');
        }
        merged.push_str(stdout.trim());
    }
    if merged.len() > ERROR_CONTEXT_BYTES {
        let mut end = ERROR_CONTEXT_BYTES;
        while !merged.is_char_boundary(end) {
            end -= 1;
        }
        merged.truncate(end);
        merged.push_str("...(truncated)");
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandRunner {
        CommandRunner::with_defaults()
    }

    #[test]
    fn run_echo() {
        let output = runner()
            .run(&CommandSpec::new("echo", ["hello", "world"]))
            .unwrap();
        assert_eq!(output.stdout.trim(), "hello world");
        assert!(!output.truncated);
    }

    #[test]
    fn stderr_is_captured() {
        let output = runner()
            .run(&CommandSpec::new("sh", ["-c", "echo oops >&2"]))
            .unwrap();
        assert!(output.stderr.contains("oops"));
    }

    #[test]
    fn nonzero_exit_carries_output() {
        let err = runner()
            .run(&CommandSpec::new("sh", ["-c", "echo denied >&2; exit 42"]))
            .unwrap_err();
        match err {
            ExecError::NonZeroExit { code, ref output } => {
                assert_eq!(code, 42);
                assert!(output.contains("denied"));
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[test]
    fn command_not_found() {
        let err = runner()
            .run(&CommandSpec::new(
                "/nonexistent/cloud-cli",
                Vec::<String>::new(),
            ))
            .unwrap_err();
        assert!(matches!(err, ExecError::CommandNotFound(_)));
    }

    #[test]
    fn shell_metacharacters_rejected() {
        let err = runner()
            .run(&CommandSpec::new("echo; rm -rf /", Vec::<String>::new()))
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand(_)));
    }

    #[test]
    fn timeout_kills_hung_command() {
        let runner = CommandRunner::new(ExecConfig {
            timeout: Some(Duration::from_millis(100)),
            ..ExecConfig::default()
        });
        let start = Instant::now();
        let err = runner.run(&CommandSpec::new("sleep", ["10"])).unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn output_truncation() {
        let runner = CommandRunner::new(ExecConfig {
            max_output_bytes: 100,
            ..ExecConfig::default()
        });
        let output = runner
            .run(&CommandSpec::new("sh", ["-c", "yes | head -n 1000"]))
            .unwrap();
        assert!(output.truncated);
        assert!(output.stdout.len() <= 100);
    }

    #[test]
    fn retry_runs_exactly_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("attempts");
        let runner = CommandRunner::new(ExecConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_ms: 10,
            },
            ..ExecConfig::default()
        });

        let script = format!("echo x >> {}; exit 1", marker.display());
        let err = runner
            .run(&CommandSpec::new("sh", ["-c", script.as_str()]))
            .unwrap_err();
        assert!(matches!(err, ExecError::NonZeroExit { .. }));

        let attempts = std::fs::read_to_string(&marker).unwrap().lines().count();
        assert_eq!(attempts, 3);
    }

    #[test]
    fn retry_stops_on_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("attempts");
        let runner = CommandRunner::new(ExecConfig {
            retry: RetryPolicy {
                max_attempts: 5,
                backoff_ms: 10,
            },
            ..ExecConfig::default()
        });

        // Fails on the first attempt, succeeds on the second.
        let script = format!(
            "echo x >> {m}; test $(wc -l < {m}) -ge 2",
            m = marker.display()
        );
        runner
            .run(&CommandSpec::new("sh", ["-c", script.as_str()]))
            .unwrap();

        let attempts = std::fs::read_to_string(&marker).unwrap().lines().count();
        assert_eq!(attempts, 2);
    }

    #[test]
    fn rendered_command_line() {
        let spec = CommandSpec::new("aws", ["ec2", "describe-instances", "--output", "json"]);
        assert_eq!(spec.rendered(), "aws ec2 describe-instances --output json");
    }
}
