//! Command-line options.

use alloy::primitives::Address;
use anyhow::{bail, Result};
use clap::Parser;

use devnode_watcher::{ANVIL_DEFAULT_PORT, APPLICATION_ADDRESS, INPUT_BOX_ADDRESS};

const LONG_ABOUT: &str = "\
Devnode is a development node for rollups applications.

Devnode was designed to work with applications running in the host machine
instead of the production machine. The application back-end should call the
rollup HTTP API to advance the rollups state and to process inspect inputs.

With the default configuration, devnode starts an embedded anvil chain and
watches the InputBox contract deployed in the canned devnet state. The
--anvil-* flags configure the embedded chain; --rpc-url replaces it with an
external endpoint.

Devnode exposes the GraphQL (/graphql) and inspect (/inspect) APIs for the
application front-end, and the rollup (/rollup) API for the application
back-end, on the address set by the --http-* flags.

To run a back-end under devnode supervision, append its command line after
`--`. Alternatively, --enable-echo starts a built-in application that
echoes every input payload back as outputs.";

#[derive(Debug, Parser)]
#[command(name = "devnode", version, about = "Development node for rollups applications", long_about = LONG_ABOUT)]
pub struct Cli {
    /// HTTP address used to serve the node APIs.
    #[arg(long, default_value = "127.0.0.1")]
    pub http_address: String,

    /// HTTP port used to serve the node APIs.
    #[arg(long, default_value_t = 8080)]
    pub http_port: u16,

    /// Port used by the embedded chain node.
    #[arg(long, default_value_t = ANVIL_DEFAULT_PORT)]
    pub anvil_port: u16,

    /// Forward the embedded chain's output to the log.
    #[arg(long)]
    pub anvil_verbose: bool,

    /// External WebSocket RPC endpoint; suppresses the embedded chain.
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// InputBox contract address.
    #[arg(long, default_value_t = INPUT_BOX_ADDRESS)]
    pub contracts_input_box_address: Address,

    /// Application contract address used to filter inputs.
    #[arg(long, default_value_t = APPLICATION_ADDRESS)]
    pub contracts_application_address: Address,

    /// Block where the historical input scan starts. Required with
    /// --rpc-url.
    #[arg(long)]
    pub contracts_input_box_block: Option<u64>,

    /// Start the built-in echo application.
    #[arg(long)]
    pub enable_echo: bool,

    /// Log debug messages.
    #[arg(long)]
    pub enable_debug: bool,

    /// Color the log output even when not on a terminal.
    #[arg(long)]
    pub enable_color: bool,

    /// Application back-end command, run under devnode supervision.
    #[arg(last = true, value_name = "APP ARGS")]
    pub application: Vec<String>,
}

/// Validated node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub http_address: String,
    pub http_port: u16,
    pub anvil_port: u16,
    pub anvil_verbose: bool,
    pub rpc_url: Option<String>,
    pub input_box_address: Address,
    pub application_address: Address,
    pub input_box_block: u64,
    pub enable_echo: bool,
    pub application: Vec<String>,
}

impl Cli {
    /// Validate the flags into a node configuration.
    pub fn into_config(self) -> Result<NodeConfig> {
        if self.anvil_port == 0 {
            bail!("invalid value for --anvil-port: port must be greater than zero");
        }
        if self.enable_echo && !self.application.is_empty() {
            bail!("can't use built-in echo with custom application");
        }
        if self.rpc_url.is_some() && self.contracts_input_box_block.is_none() {
            bail!("--contracts-input-box-block is required when --rpc-url is set");
        }
        Ok(NodeConfig {
            http_address: self.http_address,
            http_port: self.http_port,
            anvil_port: self.anvil_port,
            anvil_verbose: self.anvil_verbose,
            rpc_url: self.rpc_url,
            input_box_address: self.contracts_input_box_address,
            application_address: self.contracts_application_address,
            input_box_block: self.contracts_input_box_block.unwrap_or(0),
            enable_echo: self.enable_echo,
            application: self.application,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("devnode").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]).into_config().unwrap();
        assert_eq!(config.http_address, "127.0.0.1");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.anvil_port, 8545);
        assert_eq!(config.input_box_address, INPUT_BOX_ADDRESS);
        assert_eq!(config.input_box_block, 0);
        assert!(config.rpc_url.is_none());
        assert!(!config.enable_echo);
        assert!(config.application.is_empty());
    }

    #[test]
    fn test_echo_excludes_custom_application() {
        let cli = parse(&["--enable-echo", "--", "python3", "app.py"]);
        let err = cli.into_config().unwrap_err();
        assert_eq!(
            err.to_string(),
            "can't use built-in echo with custom application"
        );
    }

    #[test]
    fn test_rpc_url_requires_start_block() {
        let cli = parse(&["--rpc-url", "ws://example.com"]);
        assert!(cli.into_config().is_err());

        let cli = parse(&[
            "--rpc-url",
            "ws://example.com",
            "--contracts-input-box-block",
            "100",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.input_box_block, 100);
    }

    #[test]
    fn test_anvil_port_must_be_positive() {
        let cli = parse(&["--anvil-port", "0"]);
        assert!(cli.into_config().is_err());
    }

    #[test]
    fn test_trailing_application_command() {
        let cli = parse(&["--", "cargo", "run", "--release"]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.application, vec!["cargo", "run", "--release"]);
    }

    #[test]
    fn test_address_flags_parse_hex() {
        let cli = parse(&[
            "--contracts-application-address",
            "0x1111111111111111111111111111111111111111",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.application_address, Address::repeat_byte(0x11));
    }
}
