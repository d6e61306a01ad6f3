//! Ordered startup, readiness gating, and bounded teardown.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cancel::{CancelGroup, CancelToken};
use crate::worker::{Worker, WorkerError};

/// Timeout when waiting for a worker to become ready, and again when
/// waiting for workers to exit during shutdown.
pub const DEFAULT_SUPERVISOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts workers in order, waiting for each one to be ready before
/// starting the next. When any worker exits, every worker is cancelled and
/// the supervisor waits for them to finish, up to the timeout.
pub struct SupervisorWorker {
    name: String,
    workers: Vec<Arc<dyn Worker>>,
    timeout: Duration,
}

impl SupervisorWorker {
    pub fn new(name: impl Into<String>, workers: Vec<Arc<dyn Worker>>) -> Self {
        Self {
            name: name.into(),
            workers,
            timeout: DEFAULT_SUPERVISOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Worker for SupervisorWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let group = CancelGroup::new();
        let token = group.token();

        // Collapse the outer cancellation into the group.
        let forwarder = {
            let group = group.clone();
            let outer = ctx.clone();
            tokio::spawn(async move {
                outer.cancelled().await;
                group.cancel();
            })
        };

        let mut tasks = JoinSet::new();
        for worker in &self.workers {
            let (ready_tx, ready_rx) = oneshot::channel();
            let worker_clone = Arc::clone(worker);
            let worker_token = group.token();
            let worker_group = group.clone();
            let supervisor = self.name.clone();
            tasks.spawn(async move {
                let name = worker_clone.name().to_string();
                match worker_clone.start(worker_token, ready_tx).await {
                    Ok(()) => info!(%supervisor, worker = %name, "worker exited"),
                    Err(err) if err.is_cancelled() => {
                        info!(%supervisor, worker = %name, "worker exited")
                    }
                    Err(err) => {
                        warn!(%supervisor, worker = %name, %err, "worker exited with error")
                    }
                }
                // Any exit collapses the group.
                worker_group.cancel();
            });

            tokio::select! {
                result = ready_rx => match result {
                    Ok(()) => {
                        info!(supervisor = %self.name, worker = worker.name(), "worker is ready");
                    }
                    // The worker dropped its ready channel, so it exited
                    // before becoming functional; the group is already
                    // collapsing.
                    Err(_) => break,
                },
                _ = tokio::time::sleep(self.timeout) => {
                    warn!(supervisor = %self.name, worker = worker.name(),
                        "worker timed out waiting to be ready");
                    group.cancel();
                    break;
                }
                _ = token.cancelled() => break,
            }
        }

        let _ = ready.send(());
        token.cancelled().await;

        let drained = tokio::time::timeout(self.timeout, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;
        forwarder.abort();

        match drained {
            Ok(()) => {
                info!(supervisor = %self.name, "all workers exited");
                if ctx.is_cancelled() {
                    Err(WorkerError::Cancelled)
                } else {
                    Ok(())
                }
            }
            Err(_) => Err(WorkerError::ShutdownTimeout(self.name.clone())),
        }
    }
}
