use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use thiserror::Error;

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

fn max_capture_bytes() -> usize {
    std::env::var("STRAP_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

/// One external-tool invocation. The rest of the core never builds a
/// command line outside this type.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl AsRef<str>>,
        cwd: impl Into<PathBuf>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(|arg| arg.as_ref().to_string()).collect(),
            cwd: cwd.into(),
            timeout,
        }
    }

    /// Human-readable command line for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start `{command}`")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("`{command}` exited with status {code}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Execute a program and capture stdout/stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned, the timeout
/// expires, or the output streams cannot be read entirely. A non-zero exit
/// is reported through `RunOutput::code`, not as an error.
pub fn run_command(invocation: &Invocation) -> Result<RunOutput> {
    let mut command = configured_command(invocation);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = spawn(command, invocation)?;
    let stdout = take_stream(child.stdout.take(), "stdout", invocation)?;
    let stderr = take_stream(child.stderr.take(), "stderr", invocation)?;
    let limit = max_capture_bytes();
    let stdout_handle = thread::spawn(move || capture_stream(stdout, limit));
    let stderr_handle = thread::spawn(move || capture_stream(stderr, limit));

    let status = wait_with_deadline(&mut child, invocation)?;
    let code = status.code().unwrap_or(-1);
    let stdout = join_capture(stdout_handle, invocation)?;
    let stderr = join_capture(stderr_handle, invocation)?;
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

/// Execute a program while streaming its output to the parent process.
///
/// The child's stdout/stderr are teed: the operator sees install/update
/// progress live, and the captured copy still feeds error reporting.
///
/// # Errors
///
/// Same contract as [`run_command`].
pub fn run_command_streaming(invocation: &Invocation) -> Result<RunOutput> {
    let mut command = configured_command(invocation);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = spawn(command, invocation)?;
    let stdout = take_stream(child.stdout.take(), "stdout", invocation)?;
    let stderr = take_stream(child.stderr.take(), "stderr", invocation)?;
    let limit = max_capture_bytes();
    let stdout_handle = thread::spawn(move || tee_stream(stdout, io::stdout(), limit));
    let stderr_handle = thread::spawn(move || tee_stream(stderr, io::stderr(), limit));

    let status = wait_with_deadline(&mut child, invocation)?;
    let code = status.code().unwrap_or(-1);
    let stdout = join_capture(stdout_handle, invocation)?;
    let stderr = join_capture(stderr_handle, invocation)?;
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

/// Maps a non-zero exit into the structured failure callers propagate.
pub(crate) fn ensure_success(invocation: &Invocation, output: RunOutput) -> Result<RunOutput> {
    if output.code == 0 {
        Ok(output)
    } else {
        Err(ProcessError::Failed {
            command: invocation.display(),
            code: output.code,
            stderr: output.stderr,
        }
        .into())
    }
}

fn configured_command(invocation: &Invocation) -> Command {
    let mut command = Command::new(&invocation.program);
    command.args(&invocation.args);
    command.current_dir(&invocation.cwd);
    command
}

fn spawn(mut command: Command, invocation: &Invocation) -> Result<Child> {
    command
        .spawn()
        .map_err(|source| ProcessError::Launch {
            command: invocation.display(),
            source,
        })
        .map_err(Into::into)
}

fn take_stream<T>(stream: Option<T>, name: &str, invocation: &Invocation) -> Result<T> {
    stream.ok_or_else(|| anyhow::anyhow!("{name} missing for {}", invocation.program))
}

fn wait_with_deadline(child: &mut Child, invocation: &Invocation) -> Result<ExitStatus> {
    let Some(timeout) = invocation.timeout else {
        return child
            .wait()
            .with_context(|| format!("failed to wait for {}", invocation.program));
    };
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child
            .try_wait()
            .with_context(|| format!("failed to wait for {}", invocation.program))?
        {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            child.kill().ok();
            child.wait().ok();
            return Err(ProcessError::Timeout {
                command: invocation.display(),
                timeout,
            }
            .into());
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn join_capture(
    handle: thread::JoinHandle<io::Result<String>>,
    invocation: &Invocation,
) -> Result<String> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("capture thread panicked for {}", invocation.program))?
        .with_context(|| format!("failed to read output from {}", invocation.program))
}

struct CaptureBuffer {
    bytes: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl CaptureBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            truncated: false,
        }
    }

    // Keeps the newest bytes: an overflow drops from the front so the tail
    // of a long install log survives for error reporting.
    fn push(&mut self, chunk: &[u8]) {
        if self.limit == 0 {
            return;
        }
        if self.bytes.len().saturating_add(chunk.len()) <= self.limit {
            self.bytes.extend_from_slice(chunk);
            return;
        }
        self.truncated = true;
        let excess = self
            .bytes
            .len()
            .saturating_add(chunk.len())
            .saturating_sub(self.limit);
        if excess >= self.bytes.len() {
            let drop_from_chunk = excess.saturating_sub(self.bytes.len()).min(chunk.len());
            self.bytes.clear();
            self.bytes.extend_from_slice(&chunk[drop_from_chunk..]);
        } else {
            self.bytes.drain(0..excess);
            self.bytes.extend_from_slice(chunk);
        }
    }

    fn finish(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).to_string();
        if self.truncated {
            text.push_str("\n[...truncated...]\n");
        }
        text
    }
}

fn capture_stream(mut reader: impl Read, limit: usize) -> io::Result<String> {
    let mut buffer = CaptureBuffer::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.push(&chunk[..read]);
    }
    Ok(buffer.finish())
}

fn tee_stream(mut reader: impl Read, mut writer: impl Write, limit: usize) -> io::Result<String> {
    let mut buffer = CaptureBuffer::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        writer.write_all(&chunk[..read])?;
        buffer.push(&chunk[..read]);
    }
    writer.flush().ok();
    Ok(buffer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[cfg(unix)]
    fn shell(script: &str, timeout: Option<Duration>) -> Invocation {
        Invocation::new("/bin/sh", ["-c", script], Path::new("."), timeout)
    }

    #[cfg(unix)]
    #[test]
    fn run_command_captures_output_and_status() -> Result<()> {
        let output = run_command(&shell("printf out && printf err >&2; exit 7", None))?;
        assert_eq!(output.code, 7);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn run_command_truncates_large_output() -> Result<()> {
        let bytes = DEFAULT_MAX_CAPTURE_BYTES + 1024;
        let output = run_command(&shell(
            &format!("head -c {bytes} /dev/zero | tr '\\0' a"),
            None,
        ))?;
        assert!(
            output.stdout.contains("[...truncated...]"),
            "stdout should include truncation marker"
        );
        assert!(
            output.stdout.len() <= DEFAULT_MAX_CAPTURE_BYTES + 64,
            "stdout should be bounded"
        );
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn run_command_streaming_still_captures() -> Result<()> {
        let output = run_command_streaming(&shell("printf out && printf err >&2", None))?;
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn timeout_kills_the_child() {
        let err = run_command(&shell("sleep 30", Some(Duration::from_millis(200))))
            .expect_err("should time out");
        match err.downcast_ref::<ProcessError>() {
            Some(ProcessError::Timeout { .. }) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn launch_failure_is_structured() {
        let invocation = Invocation::new(
            "strap-no-such-binary",
            ["--version"],
            Path::new("."),
            None,
        );
        let err = run_command(&invocation).expect_err("should fail to launch");
        match err.downcast_ref::<ProcessError>() {
            Some(ProcessError::Launch { .. }) => {}
            other => panic!("expected launch failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn ensure_success_maps_nonzero_exit() {
        let invocation = shell("printf oops >&2; exit 3", None);
        let output = run_command(&invocation).expect("run");
        let err = ensure_success(&invocation, output).expect_err("should be an error");
        match err.downcast_ref::<ProcessError>() {
            Some(ProcessError::Failed { code, stderr, .. }) => {
                assert_eq!(*code, 3);
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected exit failure, got {other:?}"),
        }
    }

    #[test]
    fn display_joins_program_and_args() {
        let invocation = Invocation::new("git", ["fetch", "--prune", "origin"], ".", None);
        assert_eq!(invocation.display(), "git fetch --prune origin");
    }
}
