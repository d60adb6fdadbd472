//! Bounded child-process execution
//!
//! Runs one program to completion with piped output, a byte cap on each
//! captured stream and a wall-clock timeout. On unix the child leads its
//! own process group, and the whole group is killed when the run ends, so
//! processes it started (`pdflatex` under `latexmk`) cannot outlive it.

use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Output of a process that ran to completion
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Why a process did not run to completion
#[derive(Debug)]
pub enum ProcessError {
    /// The program could not be started
    Spawn(io::Error),
    /// The program was killed after the timeout elapsed
    TimedOut(Duration),
    /// Reading output or waiting for exit failed
    Io(io::Error),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Spawn(e) => write!(f, "failed to start: {}", e),
            ProcessError::TimedOut(d) => write!(f, "timed out after {}ms", d.as_millis()),
            ProcessError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

/// Run `program` with `args` in `cwd`.
pub async fn run_bounded(
    program: &Path,
    args: &[&str],
    cwd: &Path,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<ProcessOutput, ProcessError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(ProcessError::Spawn)?;
    // Dropped on every exit path, including cancellation of this future
    let _group = GroupGuard { pgid: child.id() };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProcessError::Io(io::Error::other("stdout was not captured")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ProcessError::Io(io::Error::other("stderr was not captured")))?;

    let run = async {
        tokio::try_join!(
            read_capped(stdout, max_output_bytes),
            read_capped(stderr, max_output_bytes),
            child.wait(),
        )
    };

    let result = tokio::time::timeout(timeout, run).await;
    match result {
        Ok(Ok((stdout, stderr, status))) => Ok(ProcessOutput {
            status,
            stdout,
            stderr,
        }),
        Ok(Err(e)) => Err(ProcessError::Io(e)),
        Err(_elapsed) => {
            if let Err(e) = child.kill().await {
                tracing::warn!(program = %program.display(), error = %e, "Failed to kill timed out process");
            }
            Err(ProcessError::TimedOut(timeout))
        }
    }
}

/// Kills the process group led by the child when dropped
struct GroupGuard {
    pgid: Option<u32>,
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. ESRCH (group already gone) is fine.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Read a stream to the end, keeping at most `max` bytes.
async fn read_capped<R>(mut reader: R, max: usize) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut reader).take(max as u64).read_to_end(&mut buf).await?;

    // Keep draining so the child never blocks on a full pipe.
    let discarded = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;

    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if discarded > 0 {
        text.push_str(&format!("\n[... {} bytes truncated]", discarded));
    }
    Ok(text)
}
