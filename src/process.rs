use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LaunchError;

/// Status of the supervised worker process
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerStatus {
    Running,
    Stopped,
    Failed(String),
}

/// Owns the lifecycle of the helper process that does the audio routing
pub struct Supervisor {
    program: PathBuf,
    args: Vec<String>,
    ready_marker: String,
    launch_timeout: Duration,
    status: WorkerStatus,
    child: Option<Child>,
    stdout_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
}

impl Supervisor {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        ready_marker: impl Into<String>,
        launch_timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            ready_marker: ready_marker.into(),
            launch_timeout,
            status: WorkerStatus::Stopped,
            child: None,
            stdout_task: None,
            stderr_task: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.resolved_worker_path(),
            config.server_args.clone(),
            config.ready_marker.clone(),
            config.launch_timeout(),
        )
    }

    pub fn status(&self) -> &WorkerStatus {
        &self.status
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    /// Whether a process handle is held and the process has not exited
    pub fn is_running(&mut self) -> bool {
        self.reap();
        self.child.is_some()
    }

    /// Start the worker and wait for its readiness marker.
    ///
    /// Idempotent while a live handle is held. With `restart`, any running
    /// instance is killed first.
    pub async fn ensure_started(&mut self, restart: bool) -> Result<(), LaunchError> {
        if restart {
            self.kill().await;
        }

        if self.is_running() {
            return Ok(());
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                self.status = WorkerStatus::Failed(e.to_string());
                LaunchError::Spawn(e)
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.start_kill();
            return Err(LaunchError::MissingStdout);
        };
        let pid = child.id();

        // Watch stdout for the marker, then keep draining so the pipe never fills
        let (ready_tx, ready_rx) = oneshot::channel();
        let marker = self.ready_marker.clone();
        let stdout_task = tokio::spawn(async move {
            let mut ready_tx = Some(ready_tx);
            for_each_line(stdout, |line| {
                debug!(pid, line, "worker stdout");
                if line.contains(&marker) {
                    if let Some(tx) = ready_tx.take() {
                        let _ = tx.send(());
                    }
                }
            })
            .await;
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(for_each_line(stderr, move |line| {
                warn!(pid, line, "worker stderr");
            }))
        });

        self.child = Some(child);
        self.stdout_task = Some(stdout_task);
        self.stderr_task = stderr_task;
        self.status = WorkerStatus::Running;

        match tokio::time::timeout(self.launch_timeout, ready_rx).await {
            Ok(Ok(())) => {
                info!(pid, program = %self.program.display(), "worker ready");
                Ok(())
            }
            Ok(Err(_)) => {
                warn!(pid, "worker closed stdout before signalling readiness");
                self.kill().await;
                self.status = WorkerStatus::Failed("exited before ready".to_string());
                Err(LaunchError::Exited)
            }
            Err(_) => {
                warn!(pid, timeout = ?self.launch_timeout, "worker startup timed out");
                self.kill().await;
                self.status = WorkerStatus::Failed("startup timed out".to_string());
                Err(LaunchError::Timeout(self.launch_timeout))
            }
        }
    }

    /// Kill the process if one is held. Safe to call when nothing runs.
    pub async fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            if let Err(e) = child.kill().await {
                debug!(error = %e, "worker kill failed, assuming exited");
            }
            info!(pid = ?pid, "worker stopped");
        }

        // Cancel the output capture tasks
        if let Some(task) = self.stdout_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        self.status = WorkerStatus::Stopped;
    }

    /// Drop the handle of a process that has already exited
    fn reap(&mut self) {
        let Some(child) = &mut self.child else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                warn!(code = ?status.code(), "worker exited");
                self.status = if status.success() {
                    WorkerStatus::Stopped
                } else {
                    WorkerStatus::Failed(format!("Exit code: {:?}", status.code()))
                };
                self.child = None;
            }
            Ok(None) => {}
            Err(e) => {
                self.status = WorkerStatus::Failed(e.to_string());
                self.child = None;
            }
        }
    }
}

/// Call `on_line` for every line of worker output until EOF.
///
/// The worker writes in its console codepage, so lines are decoded lossily
/// instead of ending the stream at the first invalid byte.
async fn for_each_line<R, F>(output: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => on_line(String::from_utf8_lossy(&buf).trim_end()),
            Err(e) => {
                debug!(error = %e, "worker output read failed");
                break;
            }
        }
    }
}
