//! Node assembly.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tracing::info;

use devnode_echo::EchoWorker;
use devnode_model::Dispatcher;
use devnode_supervisor::{
    CancelGroup, CommandWorker, HttpWorker, SupervisorWorker, Worker, WorkerError,
};
use devnode_watcher::{DevnetWorker, InputWatcher};

use crate::config::NodeConfig;

/// The node's HTTP surface: the rollup API for the back-end, the inspect
/// and GraphQL APIs for the front-end.
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .nest("/rollup", devnode_api::rollup::router(Arc::clone(&dispatcher)))
        .merge(devnode_api::inspect::router(Arc::clone(&dispatcher)))
        .merge(devnode_reader::router(dispatcher))
        .layer(CorsLayer::permissive())
}

/// Assemble the worker topology for the given configuration.
///
/// Startup order matters: the chain must accept connections before the
/// watcher dials it, and the HTTP server must be up before the application
/// back-end polls it.
pub fn build(config: &NodeConfig) -> Result<SupervisorWorker> {
    let dispatcher = Arc::new(Dispatcher::new());
    let mut workers: Vec<Arc<dyn Worker>> = Vec::new();

    let rpc_url = match &config.rpc_url {
        Some(url) => {
            info!(%url, "using external RPC endpoint");
            url.clone()
        }
        None => {
            workers.push(Arc::new(DevnetWorker {
                port: config.anvil_port,
                verbose: config.anvil_verbose,
            }));
            format!("ws://127.0.0.1:{}", config.anvil_port)
        }
    };

    workers.push(Arc::new(InputWatcher {
        dispatcher: Arc::clone(&dispatcher),
        rpc_url,
        input_box: config.input_box_address,
        application: config.application_address,
        start_block: config.input_box_block,
    }));

    let address: SocketAddr = format!("{}:{}", config.http_address, config.http_port)
        .parse()
        .context("invalid HTTP address")?;
    workers.push(Arc::new(HttpWorker::new(address, router(dispatcher))));

    let rollup_endpoint = format!("http://{address}/rollup");
    if config.enable_echo {
        workers.push(Arc::new(EchoWorker {
            endpoint: rollup_endpoint,
        }));
    } else if let Some((command, args)) = config.application.split_first() {
        let mut worker = CommandWorker::new("app", command, args.to_vec());
        worker.env = vec![("ROLLUP_HTTP_SERVER_URL".into(), rollup_endpoint)];
        workers.push(Arc::new(worker));
    }

    Ok(SupervisorWorker::new("devnode", workers))
}

/// Run the node until a signal or a worker failure shuts it down.
pub async fn run(config: NodeConfig) -> Result<(), WorkerError> {
    let supervisor = build(&config).map_err(|err| WorkerError::Fatal(err.to_string()))?;

    let group = CancelGroup::new();
    spawn_signal_listener(group.clone());

    let (ready_tx, _ready_rx) = oneshot::channel();
    match supervisor.start(group.token(), ready_tx).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_cancelled() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Cancel the group on SIGINT or SIGTERM.
fn spawn_signal_listener(group: CancelGroup) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = terminate.recv() => {}
                    }
                }
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("received shutdown signal");
        group.cancel();
    });
}
