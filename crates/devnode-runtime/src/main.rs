//! The devnode binary.

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use devnode_runtime::config::Cli;
use devnode_runtime::node;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let exit = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(1),
            };
            let _ = err.print();
            return exit;
        }
    };

    init_tracing(cli.enable_debug, cli.enable_color);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "devnode development node"
    );

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            return ExitCode::from(1);
        }
    };

    info!("press Ctrl+C to exit");
    if let Err(err) = node::run(config).await {
        // Worker failures already collapsed the node; report and leave.
        error!(%err, "node stopped");
    }
    ExitCode::SUCCESS
}

fn init_tracing(debug: bool, color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(color || std::io::stdout().is_terminal())
        .init();
}
