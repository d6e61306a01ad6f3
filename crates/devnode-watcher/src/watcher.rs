//! Reads inputs from the chain and puts them in the dispatcher.

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::rpc::types::{BlockTransactionsKind, Filter, Log};
use alloy::sol_types::SolEvent;
use alloy::transports::Transport;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, info};

use devnode_model::Dispatcher;
use devnode_supervisor::{CancelToken, Worker, WorkerError};

use crate::contracts::InputAdded;

/// Watches the InputBox contract for `InputAdded` events addressed to the
/// application and delivers each one, in order, to the dispatcher.
///
/// Delivery is two-phase: a log-filter scan over `[start_block, latest]`
/// resolves history, then a push subscription covers new blocks. Events
/// emitted between the end of the scan and the start of the subscription
/// can be missed; this tool is a development node, not an indexer, and the
/// gap is accepted.
pub struct InputWatcher {
    pub dispatcher: Arc<Dispatcher>,
    /// WebSocket RPC endpoint; the live phase needs a subscription.
    pub rpc_url: String,
    pub input_box: Address,
    pub application: Address,
    pub start_block: u64,
}

impl InputWatcher {
    fn filter(&self) -> Filter {
        Filter::new()
            .address(self.input_box)
            .event_signature(InputAdded::SIGNATURE_HASH)
            .topic1(self.application.into_word())
    }

    /// Resolve the block timestamp and hand the event to the dispatcher.
    async fn deliver<T, P>(&self, provider: &P, log: Log) -> Result<(), WorkerError>
    where
        T: Transport + Clone,
        P: Provider<T>,
    {
        let event = InputAdded::decode_log(&log.inner, true)
            .map_err(|err| WorkerError::Fatal(format!("watcher: undecodable log: {err}")))?
            .data;
        let block_hash = log
            .block_hash
            .ok_or_else(|| WorkerError::Fatal("watcher: log without block hash".into()))?;
        let block_number = log
            .block_number
            .ok_or_else(|| WorkerError::Fatal("watcher: log without block number".into()))?;
        let block = provider
            .get_block_by_hash(block_hash, BlockTransactionsKind::Hashes)
            .await
            .map_err(|err| WorkerError::Fatal(format!("watcher: failed to get block: {err}")))?
            .ok_or_else(|| WorkerError::Fatal("watcher: event block not found".into()))?;

        debug!(sender = %event.sender, block_number, "read input event");
        self.dispatcher.add_advance_input(
            event.sender,
            event.input,
            block_number,
            block.header.timestamp,
        );
        Ok(())
    }

    async fn watch(&self, ready: oneshot::Sender<()>) -> Result<(), WorkerError> {
        let provider = ProviderBuilder::new()
            .on_ws(WsConnect::new(&self.rpc_url))
            .await
            .map_err(|err| WorkerError::Fatal(format!("watcher: failed to dial: {err}")))?;

        // Phase 1: historical scan.
        let latest = provider
            .get_block_number()
            .await
            .map_err(|err| WorkerError::Fatal(format!("watcher: failed to get block number: {err}")))?;
        let history = self.filter().from_block(self.start_block).to_block(latest);
        let logs = provider
            .get_logs(&history)
            .await
            .map_err(|err| WorkerError::Fatal(format!("watcher: failed to filter logs: {err}")))?;
        info!(
            count = logs.len(),
            from = self.start_block,
            to = latest,
            "resolved historical inputs"
        );
        for log in logs {
            self.deliver(&provider, log).await?;
        }

        // Phase 2: live subscription.
        let subscription = provider
            .subscribe_logs(&self.filter())
            .await
            .map_err(|err| WorkerError::Fatal(format!("watcher: failed to subscribe: {err}")))?;
        let mut stream = subscription.into_stream();

        let _ = ready.send(());
        info!(input_box = %self.input_box, application = %self.application, "watching inputs");
        while let Some(log) = stream.next().await {
            self.deliver(&provider, log).await?;
        }
        Err(WorkerError::Fatal("watcher: subscription closed".into()))
    }
}

#[async_trait]
impl Worker for InputWatcher {
    fn name(&self) -> &str {
        "watcher"
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        // Cancellation drops the watch future, which closes the provider
        // and its subscription.
        tokio::select! {
            _ = ctx.cancelled() => Err(WorkerError::Cancelled),
            result = self.watch(ready) => result,
        }
    }
}
