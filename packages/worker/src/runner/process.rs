//! Child process execution under a wall-clock deadline.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long to wait for the output pipes to drain once the process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
pub enum ProcessResult {
    /// The process exited (normally or by a signal) before the deadline.
    Exited(ProcessOutput),
    /// The deadline passed and the process group was killed.
    TimedOut { elapsed: Duration },
}

/// Spawn `command`, feed it `stdin` and wait at most `deadline` for it to exit.
///
/// The child is placed in its own process group. When the call returns, the
/// whole group has been sent SIGKILL, so neither a timed-out program nor any
/// background children it left behind keep running. Captured output is cut
/// at `max_output` bytes per stream while the pipes keep being drained.
///
/// An `Err` means the process could not be started or waited on.
pub async fn run_with_deadline(
    mut command: Command,
    stdin: &str,
    deadline: Duration,
    max_output: usize,
) -> io::Result<ProcessResult> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);

    let started = Instant::now();
    let mut child = command.spawn()?;
    let pid = child.id();

    let stdin_task = child.stdin.take().map(|mut pipe| {
        let input = stdin.as_bytes().to_vec();
        tokio::spawn(async move {
            // The program may exit without reading its input.
            let _ = pipe.write_all(&input).await;
            let _ = pipe.shutdown().await;
        })
    });
    let mut stdout_task = child
        .stdout
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, max_output)));
    let mut stderr_task = child
        .stderr
        .take()
        .map(|pipe| tokio::spawn(read_capped(pipe, max_output)));

    let waited = tokio::time::timeout(deadline, child.wait()).await;
    kill_process_group(pid);

    let status = match waited {
        Ok(status) => Some(status?),
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            None
        }
    };
    let elapsed = started.elapsed();

    if let Some(task) = stdin_task {
        task.abort();
    }
    let stdout = drain(stdout_task.as_mut()).await;
    let stderr = drain(stderr_task.as_mut()).await;

    let Some(status) = status else {
        debug!(pid = ?pid, elapsed_ms = elapsed.as_millis() as u64, "Process killed at deadline");
        return Ok(ProcessResult::TimedOut { elapsed });
    };

    debug!(
        pid = ?pid,
        ?status,
        elapsed_ms = elapsed.as_millis() as u64,
        "Process exited"
    );
    Ok(ProcessResult::Exited(ProcessOutput {
        status,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        elapsed,
    }))
}

fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pid, error = %e, "Failed to kill process group"),
    }
}

async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                kept.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    kept
}

async fn drain(task: Option<&mut JoinHandle<Vec<u8>>>) -> Vec<u8> {
    let Some(task) = task else {
        return Vec::new();
    };
    match tokio::time::timeout(DRAIN_GRACE, &mut *task).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            task.abort();
            Vec::new()
        }
    }
}
