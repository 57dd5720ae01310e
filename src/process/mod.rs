//! Out-of-process command execution with a wall-clock deadline.

use std::{io, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

pub mod python;

/// Captured result of a process that exited on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Exited(ProcessOutput),
    /// The deadline passed; the child has been killed and reaped.
    TimedOut,
}

/// Spawn `cmd`, capture both output streams, and wait at most `limit`.
///
/// On deadline the child is killed and waited for before returning, so no
/// process outlives the call. Spawn and wait failures surface as `io::Error`.
pub async fn run_with_timeout(mut cmd: Command, limit: Duration) -> io::Result<CommandOutcome> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    debug!(command = ?cmd.as_std(), timeout_secs = limit.as_secs(), "spawning process");

    let mut child = cmd.spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no stderr"))?;

    // Drain both pipes while waiting so a chatty child never blocks on a full pipe.
    let stdout_task = drain(stdout);
    let stderr_task = drain(stderr);

    match timeout(limit, child.wait()).await {
        Ok(status) => {
            let status = status?;
            Ok(CommandOutcome::Exited(ProcessOutput {
                exit_code: status.code(),
                stdout: collect(stdout_task).await,
                stderr: collect(stderr_task).await,
            }))
        }
        Err(_) => {
            if let Err(e) = child.kill().await {
                warn!("failed to kill timed out process: {}", e);
            }
            // Grandchildren may still hold the pipes open.
            stdout_task.abort();
            stderr_task.abort();
            Ok(CommandOutcome::TimedOut)
        }
    }
}

fn drain<R>(mut reader: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf).await {
            warn!("failed to read process output: {}", e);
        }
        buf
    })
}

async fn collect(task: JoinHandle<Vec<u8>>) -> String {
    match task.await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}
