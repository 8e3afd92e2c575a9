use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use nyaedge_config::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "nyaedge",
    version,
    about = "Control plane for edge nodes: registration, sessions and endpoint activation"
)]
pub struct Cli {
    /// Data directory (config, node registry, signing key, logs)
    #[arg(long, env = "NYAEDGE_DATA_DIR", value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Config file (default: <data-dir>/config.toml)
    #[arg(long, env = "NYAEDGE_CONFIG", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Listen address (overrides [server].address)
    #[arg(long, env = "NYAEDGE_ADDRESS")]
    pub address: Option<String>,

    /// HTTP port (overrides [server].port)
    #[arg(long, env = "NYAEDGE_PORT", global = true)]
    pub port: Option<u16>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "NYAEDGE_LOG", default_value = "info")]
    pub log_level: String,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to file (in addition to stderr)
    #[arg(long, env = "NYAEDGE_LOG_FILE", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    /// Control plane endpoint for operator commands (e.g. "http://localhost:8080")
    #[arg(long, env = "NYAEDGE_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the control plane (default when no subcommand is given)
    Serve,
    /// Node administration against a running control plane
    Node(NodeCommand),
    /// Check whether a control plane is answering at the endpoint
    Status,
    /// Show version information
    Version,
}

#[derive(Args, Debug)]
pub struct NodeCommand {
    #[command(subcommand)]
    pub command: NodeSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum NodeSubcommand {
    /// Register a node and print its one-time secret
    Create {
        /// Human-readable node name
        name: String,
    },
    /// Verify a node's endpoint and record it
    Up {
        /// Node identifier
        id: String,
        /// Endpoint the node's ping service listens on (e.g. "http://203.0.113.5:9000")
        endpoint: String,
    },
}

/// Resolved runtime configuration: config file values with CLI/env overrides.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub address: String,
    pub port: u16,
    pub storage_path: PathBuf,
    pub signing_key_path: PathBuf,
    pub audit_path: PathBuf,
    pub ping_timeout: std::time::Duration,
}

impl Config {
    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir
            .clone()
            .unwrap_or_else(nyaedge_common::paths::data_dir)
    }

    pub fn config_path(cli: &Cli) -> PathBuf {
        cli.config
            .clone()
            .unwrap_or_else(|| nyaedge_config::dirs::config_path(&Self::data_dir(cli)))
    }

    pub fn resolve(cli: &Cli, settings: &Settings) -> Self {
        let data_dir = Self::data_dir(cli);
        Self {
            address: cli
                .address
                .clone()
                .unwrap_or_else(|| settings.server.address.clone()),
            port: cli.port.unwrap_or(settings.server.port),
            storage_path: settings.storage_path(&data_dir),
            signing_key_path: settings.signing_key_path(&data_dir),
            audit_path: nyaedge_nodes::audit::AuditLog::path_in(&data_dir),
            ping_timeout: settings.ping_timeout(),
            data_dir,
        }
    }

    /// Default endpoint for operator commands talking to this host.
    pub fn local_endpoint(cli: &Cli, settings: &Settings) -> String {
        let port = cli.port.unwrap_or(settings.server.port);
        format!("http://localhost:{port}")
    }
}
