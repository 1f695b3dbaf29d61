use clap::{Parser, ValueEnum};
use rdmafit_scheduler::types::{DEFAULT_INVENTORY_PATH, DEFAULT_INVENTORY_PORT};
use rdmafit_scheduler::{HttpInventoryClient, InventoryClient, ProbeConfig, RdmaFilter, SelectionKind};
use rdmafit_webhook::{AppState, Config as WebhookConfig, WebhookServer, DEFAULT_PORT};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "rdmafit", about = "RDMA-aware Kubernetes scheduler extender")]
struct Cli {
    /// Port to listen on for scheduler filter requests
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Address to bind the listener to
    #[arg(long, env = "RDMAFIT_BIND_ADDRESS", default_value = "0.0.0.0")]
    bind_address: IpAddr,
    /// Port of the RDMA hardware daemon on each node
    #[arg(long, env = "RDMAFIT_INVENTORY_PORT", default_value_t = DEFAULT_INVENTORY_PORT)]
    inventory_port: u16,
    /// HTTP path of the daemon's inventory endpoint
    #[arg(long, env = "RDMAFIT_INVENTORY_PATH", default_value = DEFAULT_INVENTORY_PATH)]
    inventory_path: String,
    /// Timeout for each node address probe, in milliseconds
    #[arg(long, env = "RDMAFIT_PROBE_TIMEOUT_MS", default_value_t = 1500)]
    probe_timeout_ms: u64,
    /// How to choose among nodes that fit (tightest-fit or all-feasible)
    #[arg(long, env = "RDMAFIT_SELECTION", default_value = "tightest-fit")]
    selection: SelectionKind,
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            port: self.inventory_port,
            path: self.inventory_path.clone(),
            timeout: Duration::from_millis(self.probe_timeout_ms),
        }
    }

    fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
    }

    run(cli).await
}

async fn run(cli: Cli) -> miette::Result<()> {
    let probe_config = cli.probe_config();
    info!(
        "Probing node inventory on port {} at {} (timeout {:?})",
        probe_config.port, probe_config.path, probe_config.timeout
    );

    let client: Arc<dyn InventoryClient> = Arc::new(HttpInventoryClient::new(&probe_config));
    let filter = RdmaFilter::with_client(client, &probe_config, cli.selection);
    let state = Arc::new(AppState::new(filter));

    let listen_addr = cli.listen_addr();
    let server = WebhookServer::new(WebhookConfig { listen_addr }, state);

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down gracefully...");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for ctrl-c: {}", e),
        }
    });

    server
        .run(token)
        .await
        .map_err(|e| miette::miette!("Webhook server error on {}: {}", listen_addr, e))?;

    info!("Shutdown complete");

    Ok(())
}
