//! HTTP server worker.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use crate::cancel::CancelToken;
use crate::worker::{Worker, WorkerError};

/// Serves an axum router, signalling readiness once the listener is bound
/// and shutting down gracefully when the group is cancelled.
pub struct HttpWorker {
    pub address: SocketAddr,
    pub router: Router,
}

impl HttpWorker {
    pub fn new(address: SocketAddr, router: Router) -> Self {
        Self { address, router }
    }
}

#[async_trait]
impl Worker for HttpWorker {
    fn name(&self) -> &str {
        "http"
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let listener = TcpListener::bind(self.address).await?;
        info!(addr = %listener.local_addr()?, "http server listening");
        let _ = ready.send(());

        let shutdown = ctx.clone();
        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        if ctx.is_cancelled() {
            Err(WorkerError::Cancelled)
        } else {
            Ok(())
        }
    }
}
