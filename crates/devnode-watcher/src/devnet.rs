//! The embedded development chain.

use alloy::primitives::{address, Address};
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::warn;

use devnode_supervisor::{CancelToken, CommandWorker, ServerWorker, Worker, WorkerError};

/// Default port for the embedded chain node.
pub const ANVIL_DEFAULT_PORT: u16 = 8545;

/// InputBox address in the canned devnet deployment.
pub const INPUT_BOX_ADDRESS: Address = address!("59b22D57D4f067708AB0c00552767405926dc768");

/// Application address in the canned devnet deployment.
pub const APPLICATION_ADDRESS: Address = address!("70ac08179605AF2D9e75782b8DEcDD3c22aA4D0C");

/// Chain state loaded into anvil on startup: the development mnemonic
/// accounts, funded.
static ANVIL_STATE: &[u8] = include_bytes!("devnet-state.json");

/// Runs `anvil` with the canned devnet state.
///
/// The state snapshot is written to a per-run temp directory that is
/// removed when the worker exits; leaking it on a crash is acceptable.
/// Readiness is a TCP probe against the anvil port, since the process
/// itself cannot tell us when its RPC server is up.
pub struct DevnetWorker {
    pub port: u16,
    /// Forward the chain's stdio to the log instead of silencing it.
    pub verbose: bool,
}

impl DevnetWorker {
    fn args(&self, state_file: &str) -> Vec<String> {
        let mut args = vec![
            "--port".into(),
            self.port.to_string(),
            "--block-time".into(),
            "1".into(),
            "--load-state".into(),
            state_file.into(),
        ];
        if !self.verbose {
            args.push("--silent".into());
        }
        args
    }
}

#[async_trait]
impl Worker for DevnetWorker {
    fn name(&self) -> &str {
        "anvil"
    }

    async fn start(
        &self,
        ctx: CancelToken,
        ready: oneshot::Sender<()>,
    ) -> Result<(), WorkerError> {
        let state_dir = tempfile::tempdir()?;
        let state_file = state_dir.path().join("anvil-state.json");
        tokio::fs::write(&state_file, ANVIL_STATE).await?;

        let server = ServerWorker {
            command: CommandWorker::new(
                "anvil",
                "anvil",
                self.args(&state_file.to_string_lossy()),
            ),
            port: self.port,
        };
        let result = server.start(ctx, ready).await;

        if let Err(err) = state_dir.close() {
            warn!(%err, "failed to remove devnet state dir");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_unless_verbose() {
        let worker = DevnetWorker {
            port: 8545,
            verbose: false,
        };
        let args = worker.args("/tmp/state.json");
        assert!(args.contains(&"--silent".to_string()));
        assert!(args.contains(&"--load-state".to_string()));

        let worker = DevnetWorker {
            port: 8545,
            verbose: true,
        };
        assert!(!worker.args("/tmp/state.json").contains(&"--silent".to_string()));
    }

    #[test]
    fn test_embedded_state_is_valid_shape() {
        // The snapshot must at least be an object with funded accounts.
        let state: serde_json::Value = serde_json::from_slice(ANVIL_STATE).unwrap();
        assert!(state["accounts"].is_object());
    }
}
