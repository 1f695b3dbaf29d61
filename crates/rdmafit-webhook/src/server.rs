use crate::handlers::*;
use crate::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Path the scheduler POSTs filter requests to
pub const FILTER_PATH: &str = "/scheduler/rdma_scheduling";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8888;

/// Webhook server configuration
#[derive(Clone)]
pub struct Config {
    /// Address to listen on
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        }
    }
}

/// Scheduler extender webhook server
pub struct WebhookServer {
    config: Config,
    state: Arc<AppState>,
}

impl WebhookServer {
    /// Create a new webhook server
    pub fn new(config: Config, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        Router::new()
            // Health checks
            .route("/healthz", get(healthz))
            .route("/livez", get(livez))
            .route("/readyz", get(readyz))
            // Extender filter callback
            .route(FILTER_PATH, post(filter_nodes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until `token` is cancelled
    ///
    /// Fails only if the listener cannot be bound or the accept loop dies.
    pub async fn run(self, token: CancellationToken) -> Result<(), std::io::Error> {
        let app = self.build_router();

        let listener = TcpListener::bind(self.config.listen_addr).await?;

        info!(
            "RDMA scheduler extender listening on {} (policy: {}, placement: {})",
            self.config.listen_addr,
            self.state.filter.policy_name(),
            self.state.filter.placement_name()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }
}
