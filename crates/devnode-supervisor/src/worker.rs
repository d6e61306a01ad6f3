//! The worker contract.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::cancel::CancelToken;

/// Error returned by a worker's run.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker stopped because its cancellation token fired. This is
    /// normal shutdown, not a failure.
    #[error("worker cancelled")]
    Cancelled,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Workers did not exit within the supervisor timeout.
    #[error("{0}: timed out waiting for workers")]
    ShutdownTimeout(String),

    #[error("{0}")]
    Fatal(String),
}

impl WorkerError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A long-running service managed by the supervisor.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Name used to prefix log lines about this worker.
    fn name(&self) -> &str;

    /// Run the worker to completion.
    ///
    /// The worker must send exactly one message on `ready` once its
    /// externally observable service is functional, and should return
    /// [`WorkerError::Cancelled`] when it stops because `ctx` fired.
    async fn start(&self, ctx: CancelToken, ready: oneshot::Sender<()>)
        -> Result<(), WorkerError>;
}
