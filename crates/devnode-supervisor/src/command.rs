//! Subprocess workers.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::worker::{Worker, WorkerError};

/// Poll interval when probing whether a server subprocess is up.
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs a subprocess that is expected to live until cancellation.
///
/// Stdout and stderr are split into lines and forwarded to the log with the
/// worker name attached. On cancellation the subprocess receives the
/// platform's termination signal; on Unix it is placed in its own process
/// group and the whole group is signalled, so grandchildren die too, while
/// on other platforms only the direct child is killed.
pub struct CommandWorker {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandWorker {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }

    fn spawn_child(&self) -> Result<Child, WorkerError> {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        #[cfg(unix)]
        command.process_group(0);
        Ok(command.spawn()?)
    }

    /// Ask the subprocess to terminate.
    #[cfg(unix)]
    fn terminate(&self, child: &mut Child) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        // The child leads its own process group; signal the group so any
        // grandchildren are terminated as well.
        let Some(pid) = child.id() else {
            return;
        };
        if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            warn!(worker = %self.name, %err, "failed to send SIGTERM");
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, child: &mut Child) {
        // There is no portable group signal outside Unix; kill the direct
        // child only.
        let _ = child.start_kill();
    }

    async fn run(&self, ctx: CancelToken, ready: Option<oneshot::Sender<()>>) -> Result<(), WorkerError> {
        let mut child = self.spawn_child()?;
        if let Some(stdout) = child.stdout.take() {
            forward_lines(self.name.clone(), stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(self.name.clone(), stderr);
        }
        if let Some(ready) = ready {
            let _ = ready.send(());
        }

        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = ctx.cancelled() => None,
        };
        match status {
            Some(status) => {
                if ctx.is_cancelled() {
                    Err(WorkerError::Cancelled)
                } else if status.success() {
                    Ok(())
                } else {
                    Err(WorkerError::Fatal(format!(
                        "{}: exited with {status}",
                        self.name
                    )))
                }
            }
            None => {
                self.terminate(&mut child);
                let _ = child.wait().await;
                Err(WorkerError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl Worker for CommandWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        self.run(ctx, Some(ready)).await
    }
}

/// A [`CommandWorker`] whose readiness is observed from the outside: the
/// worker is ready once a TCP connection to `port` succeeds, not when the
/// process is spawned.
pub struct ServerWorker {
    pub command: CommandWorker,
    pub port: u16,
}

#[async_trait]
impl Worker for ServerWorker {
    fn name(&self) -> &str {
        &self.command.name
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let probe_ctx = ctx.clone();
        let port = self.port;
        let probe = tokio::spawn(async move {
            loop {
                if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                    let _ = ready.send(());
                    return;
                }
                tokio::select! {
                    _ = probe_ctx.cancelled() => return,
                    _ = tokio::time::sleep(SERVER_POLL_INTERVAL) => {}
                }
            }
        });

        let result = self.command.run(ctx, None).await;
        probe.abort();
        result
    }
}

/// Forward each line of a child stream to the log.
fn forward_lines(name: String, stream: impl AsyncRead + Unpin + Send + 'static) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(worker = %name, "{line}");
        }
    });
}

#[cfg(test)]
mod tests {
    use crate::cancel::CancelGroup;

    use super::*;

    #[tokio::test]
    async fn test_command_output_and_exit() {
        // A process that exits on its own, successfully, is not an error
        // unless the group was cancelled.
        let worker = CommandWorker::new("true", "true", vec![]);
        let group = CancelGroup::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let result = worker.start(group.token(), ready_tx).await;
        assert!(result.is_ok());
        assert!(ready_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal() {
        let worker = CommandWorker::new("nope", "devnode-test-no-such-binary", vec![]);
        let group = CancelGroup::new();
        let (ready_tx, _ready_rx) = oneshot::channel();
        let result = worker.start(group.token(), ready_tx).await;
        assert!(matches!(result, Err(WorkerError::Io(_))));
    }

    #[tokio::test]
    async fn test_cancellation_terminates_the_child() {
        let worker = CommandWorker::new("sleeper", "sleep", vec!["30".into()]);
        let group = CancelGroup::new();
        let (ready_tx, ready_rx) = oneshot::channel();
        let token = group.token();
        let handle = tokio::spawn(async move { worker.start(token, ready_tx).await });

        ready_rx.await.unwrap();
        group.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("child did not terminate after cancel")
            .unwrap();
        assert!(matches!(result, Err(WorkerError::Cancelled)));
    }
}
