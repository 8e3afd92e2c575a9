mod cli;
mod client;
mod keys;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use nyaedge_config::Settings;
use nyaedge_crypto::token::TokenIssuer;
use nyaedge_nodes::{HttpPinger, JsonFileStore, NodesCore};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use cli::{Cli, Command, Config, NodeSubcommand};

/// Maximum time to wait for orderly shutdown before forcing exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => cli.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Hold the non-blocking guards for the lifetime of main so logs flush on exit.
    let _log_guards = init_logging(env_filter, cli.log_file.as_deref())?;

    match &cli.command {
        Some(Command::Version) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "platform": std::env::consts::OS,
                    })
                );
            } else {
                println!("nyaedge {}", env!("CARGO_PKG_VERSION"));
            }
            Ok(())
        }
        Some(Command::Node(node_cmd)) => {
            let endpoint = operator_endpoint(&cli)?;
            dispatch_node(&node_cmd.command, &endpoint, cli.json)
        }
        Some(Command::Status) => {
            let endpoint = operator_endpoint(&cli)?;
            let report = status(&client::NyaedgeClient::new(&endpoint), &endpoint);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.running {
                println!("nyaedge is running at {}", report.endpoint);
            } else {
                println!("nyaedge is not reachable at {}", report.endpoint);
                if let Some(error) = &report.error {
                    println!("  {error}");
                }
            }
            Ok(())
        }
        Some(Command::Serve) | None => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(cli))
        }
    }
}

// ── Operator commands ───────────────────────────────────────────────

fn operator_endpoint(cli: &Cli) -> anyhow::Result<String> {
    if let Some(endpoint) = &cli.endpoint {
        return Ok(endpoint.clone());
    }
    let settings = Settings::load(&Config::config_path(cli))?;
    Ok(Config::local_endpoint(cli, &settings))
}

#[derive(Debug, serde::Serialize)]
struct StatusReport {
    version: &'static str,
    endpoint: String,
    running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn status(client: &client::NyaedgeClient, endpoint: &str) -> StatusReport {
    let health = client.health();
    if let Err(e) = &health {
        tracing::debug!(endpoint, error = %e, "Health check failed");
    }
    StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        endpoint: endpoint.to_string(),
        running: health.is_ok(),
        error: health.err().map(|e| e.to_string()),
    }
}

fn dispatch_node(cmd: &NodeSubcommand, endpoint: &str, json: bool) -> anyhow::Result<()> {
    let client = client::NyaedgeClient::new(endpoint);
    match cmd {
        NodeSubcommand::Create { name } => {
            let created = client.create_node(name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("Created node {}", created.name);
                println!("  ID:      {}", created.id);
                println!("  Secret:  {}", created.node_secret);
                println!();
                println!("The secret is shown only once. Store it on the node now.");
            }
        }
        NodeSubcommand::Up { id, endpoint } => {
            let up = client.node_up(id, endpoint)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&up)?);
            } else {
                println!("Node {} is up at {endpoint}", up.node_id);
            }
        }
    }
    Ok(())
}

// ── Control plane ───────────────────────────────────────────────────

async fn serve(cli: Cli) -> anyhow::Result<()> {
    let data_dir = Config::data_dir(&cli);
    nyaedge_config::dirs::ensure_data_dir(&data_dir);

    let config_path = Config::config_path(&cli);
    let settings = Settings::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let config = Config::resolve(&cli, &settings);
    startup_diagnostics(&config);

    let core = build_core(&config)?;

    let cancel = CancellationToken::new();
    let mut server = {
        let token = cancel.clone();
        let config = config.clone();
        tokio::spawn(async move { start_http(core, &config, token).await })
    };

    tracing::info!("Ready.");

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutting down...");
        }
        res = &mut server => {
            // Only reached when the server stops on its own (e.g. bind failure).
            return res.map_err(|e| anyhow::anyhow!("HTTP server task failed: {e}"))?;
        }
    }

    cancel.cancel();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Err(e))) => tracing::warn!(error = %e, "HTTP server stopped with error"),
        Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server task failed"),
        Ok(Ok(Ok(()))) => {}
        Err(_) => tracing::warn!(
            "Shutdown timed out after {:?}, forcing exit",
            SHUTDOWN_TIMEOUT
        ),
    }

    Ok(())
}

/// Wire the node domain from resolved configuration.
fn build_core(config: &Config) -> anyhow::Result<NodesCore> {
    let key = keys::load_or_generate(&config.signing_key_path)?;
    let issuer = Arc::new(TokenIssuer::new(key));

    let store = JsonFileStore::open(&config.storage_path)
        .with_context(|| format!("opening node registry {}", config.storage_path.display()))?;
    let pinger = HttpPinger::new(config.ping_timeout).context("building ping client")?;

    Ok(
        NodesCore::builder(Arc::new(store), issuer, Arc::new(pinger))
            .audit_log(config.audit_path.clone())
            .build(),
    )
}

/// Full HTTP application: operational routes plus the node API under `/api`.
///
/// No CORS layer: `/api/admin/createnode` returns a node secret and must
/// stay unreadable to cross-origin scripts.
fn app(core: &NodesCore) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/healthz", get(health))
        .nest("/api", core.routes())
        .layer(TraceLayer::new_for_http())
}

async fn start_http(
    core: NodesCore,
    config: &Config,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.address, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.address, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("HTTP listening on {}", addr);

    axum::serve(listener, app(&core))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::debug!("HTTP server stopped");
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": format!("nyaedge control plane v{}", env!("CARGO_PKG_VERSION")),
    }))
}

// ── Infrastructure helpers ──────────────────────────────────────────

/// Wait for Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn startup_diagnostics(config: &Config) {
    tracing::info!("nyaedge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Platform: {}", std::env::consts::OS);

    match hostname::get() {
        Ok(h) => tracing::info!("Hostname: {}", h.to_string_lossy()),
        Err(e) => tracing::warn!(error = %e, "Could not determine hostname"),
    }

    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Node registry: {}", config.storage_path.display());
    tracing::info!("Audit log: {}", config.audit_path.display());
    tracing::info!("Ping timeout: {}s", config.ping_timeout.as_secs());
}

// ── Logging setup ───────────────────────────────────────────────────

/// Initialize tracing with stderr + optional file output.
/// Returns guards that must be held for the lifetime of the program
/// to ensure the non-blocking writers flush on shutdown.
fn init_logging(
    env_filter: tracing_subscriber::EnvFilter,
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Vec<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::prelude::*;

    let (nb_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(nb_stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (nb_file, file_guard) = tracing_appender::non_blocking(file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(nb_file);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();

        Ok(vec![stderr_guard, file_guard])
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();

        Ok(vec![stderr_guard])
    }
}
