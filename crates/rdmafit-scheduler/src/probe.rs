use crate::error::ProbeError;
use crate::types::ProbeConfig;
use async_trait::async_trait;
use rdmafit_core::{is_internal_address, NodeAddress, NodeInventory};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Upper bound on an inventory response body
pub const MAX_INVENTORY_BODY_BYTES: usize = 1024 * 1024;

/// Source of live RDMA inventory for a node address
///
/// Abstracts the per-node hardware daemon so the prober can be tested with
/// `MockInventoryClient`.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetch the physical functions reported at `address`
    async fn query(&self, address: &str) -> Result<NodeInventory, ProbeError>;
}

/// Queries the RDMA hardware daemon over HTTP
pub struct HttpInventoryClient {
    client: Client,
    port: u16,
    path: String,
}

impl HttpInventoryClient {
    pub fn new(config: &ProbeConfig) -> Self {
        let path = if config.path.starts_with('/') {
            config.path.clone()
        } else {
            format!("/{}", config.path)
        };

        Self {
            client: Client::new(),
            port: config.port,
            path,
        }
    }

    /// GET URL of the inventory endpoint for one node address
    pub fn url_for(&self, address: &str) -> String {
        // Bare IPv6 literals need brackets before the port
        if address.contains(':') && !address.starts_with('[') {
            format!("http://[{}]:{}{}", address, self.port, self.path)
        } else {
            format!("http://{}:{}{}", address, self.port, self.path)
        }
    }
}

#[async_trait]
impl InventoryClient for HttpInventoryClient {
    async fn query(&self, address: &str) -> Result<NodeInventory, ProbeError> {
        let url = self.url_for(address);
        debug!("GET {}", url);

        let mut resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::unreachable(address, format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ProbeError::unreachable(
                address,
                format!("inventory query returned status {}", resp.status()),
            ));
        }

        if let Some(len) = resp.content_length() {
            if len > MAX_INVENTORY_BODY_BYTES as u64 {
                return Err(oversized_body(address));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ProbeError::unreachable(address, format!("HTTP read failed: {}", e)))?
        {
            if body.len() + chunk.len() > MAX_INVENTORY_BODY_BYTES {
                return Err(oversized_body(address));
            }
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice::<NodeInventory>(&body)
            .map_err(|e| ProbeError::malformed_response(address, e.to_string()))
    }
}

fn oversized_body(address: &str) -> ProbeError {
    ProbeError::malformed_response(
        address,
        format!("inventory body exceeds {} bytes", MAX_INVENTORY_BODY_BYTES),
    )
}

/// Read a node's inventory from the first internal address that answers
///
/// Addresses are tried in order, each bounded by `timeout` and never retried.
/// Non-internal addresses are skipped without any network call.
pub async fn probe_node(
    client: &dyn InventoryClient,
    addresses: &[NodeAddress],
    timeout: Duration,
) -> Result<NodeInventory, ProbeError> {
    let mut attempts = 0;
    let mut last_error = None;

    for addr in addresses.iter().filter(|a| is_internal_address(a)) {
        attempts += 1;

        let result = match tokio::time::timeout(timeout, client.query(&addr.address)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::timeout(
                addr.address.as_str(),
                timeout.as_millis() as u64,
            )),
        };

        match result {
            Ok(inventory) => return Ok(inventory),
            Err(e) => {
                debug!("Probe of {} ({}) failed: {}", addr.address, addr.type_, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        None => Err(ProbeError::NoInternalAddress),
        Some(e) => Err(ProbeError::AllAddressesFailed {
            attempts,
            last_error: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInventoryClient;
    use rdmafit_core::PhysicalFunction;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn addr(address: &str, type_: &str) -> NodeAddress {
        NodeAddress {
            address: address.to_string(),
            type_: type_.to_string(),
        }
    }

    fn inventory() -> NodeInventory {
        vec![PhysicalFunction::new(8, 0, 10000, 0)]
    }

    /// Serve exactly one HTTP response on a fresh local port
    async fn serve_once(status_line: &'static str, body: impl Into<String>) -> u16 {
        let body = body.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });

        port
    }

    /// Like `serve_once`, but the body is delimited by closing the connection
    async fn serve_unsized(body: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let head = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n";
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body.as_bytes()).await;
            }
        });

        port
    }

    fn client_for_port(port: u16) -> HttpInventoryClient {
        HttpInventoryClient::new(&ProbeConfig {
            port,
            ..Default::default()
        })
    }

    #[test]
    fn test_url_for() {
        let client = HttpInventoryClient::new(&ProbeConfig::default());
        assert_eq!(client.url_for("10.0.0.5"), "http://10.0.0.5:54005/getpfs");
        assert_eq!(client.url_for("fd00::5"), "http://[fd00::5]:54005/getpfs");

        let client = HttpInventoryClient::new(&ProbeConfig {
            path: "pfs".to_string(),
            ..Default::default()
        });
        assert_eq!(client.url_for("node-a"), "http://node-a:54005/pfs");
    }

    #[tokio::test]
    async fn test_http_query_success() {
        let port = serve_once(
            "HTTP/1.1 200 OK",
            r#"[{"name":"mlx5_0","capacity_vfs":8,"used_vfs":1,"capacity_tx_rate":25000,"used_tx_rate":1000}]"#,
        )
        .await;

        let pfs = client_for_port(port).query("127.0.0.1").await.unwrap();
        assert_eq!(pfs.len(), 1);
        assert_eq!(pfs[0].free_vfs(), 7);
        assert_eq!(pfs[0].free_tx_rate(), 24000);
    }

    #[tokio::test]
    async fn test_http_query_malformed_body() {
        let port = serve_once("HTTP/1.1 200 OK", r#"{"pfs": "nope"}"#).await;

        let err = client_for_port(port).query("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_http_query_rejects_oversized_body() {
        let body = format!("[{}]", " ".repeat(MAX_INVENTORY_BODY_BYTES));
        let port = serve_once("HTTP/1.1 200 OK", body).await;

        let err = client_for_port(port).query("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { .. }));
        assert!(err.to_string().contains("exceeds"));
    }

    #[tokio::test]
    async fn test_http_query_rejects_oversized_unsized_body() {
        let body = format!("[{}]", " ".repeat(MAX_INVENTORY_BODY_BYTES));
        let port = serve_unsized(body).await;

        let err = client_for_port(port).query("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_http_query_error_status() {
        let port = serve_once("HTTP/1.1 503 Service Unavailable", "").await;

        let err = client_for_port(port).query("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_http_query_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = client_for_port(port).query("127.0.0.1").await.unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_probe_skips_non_internal_addresses() {
        let client = MockInventoryClient::new();
        client.respond("1.2.3.4", inventory());

        let addresses = vec![addr("1.2.3.4", "ExternalIP"), addr("node-a", "Hostname")];
        let err = probe_node(&client, &addresses, Duration::from_millis(1500))
            .await
            .unwrap_err();

        assert_eq!(err, ProbeError::NoInternalAddress);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_probe_empty_address_list() {
        let client = MockInventoryClient::new();

        let err = probe_node(&client, &[], Duration::from_millis(1500))
            .await
            .unwrap_err();

        assert_eq!(err, ProbeError::NoInternalAddress);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_probe_falls_through_to_next_internal_address() {
        let client = MockInventoryClient::new();
        client.fail("10.0.0.1", ProbeError::unreachable("10.0.0.1", "connection refused"));
        client.respond("node-a.cluster.local", inventory());
        client.respond("10.0.0.9", inventory());

        let addresses = vec![
            addr("10.0.0.1", "InternalIP"),
            addr("203.0.113.7", "ExternalIP"),
            addr("node-a.cluster.local", "InternalDNS"),
            addr("10.0.0.9", "InternalIP"),
        ];
        let pfs = probe_node(&client, &addresses, Duration::from_millis(1500))
            .await
            .unwrap();

        assert_eq!(pfs, inventory());
        // Stops at the first address that answers
        assert_eq!(client.calls(), vec!["10.0.0.1", "node-a.cluster.local"]);
    }

    #[tokio::test]
    async fn test_probe_all_addresses_failed() {
        let client = MockInventoryClient::new();

        let addresses = vec![addr("10.0.0.1", "InternalIP"), addr("10.0.0.2", "InternalIP")];
        let err = probe_node(&client, &addresses, Duration::from_millis(1500))
            .await
            .unwrap_err();

        assert!(matches!(err, ProbeError::AllAddressesFailed { attempts: 2, .. }));
        assert_eq!(client.calls(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_moves_to_next_address() {
        let client = MockInventoryClient::new();
        client.respond_after("10.0.0.1", inventory(), Duration::from_secs(10));
        client.respond("10.0.0.2", inventory());

        let addresses = vec![addr("10.0.0.1", "InternalIP"), addr("10.0.0.2", "InternalIP")];
        let pfs = probe_node(&client, &addresses, Duration::from_millis(1500))
            .await
            .unwrap();

        assert_eq!(pfs, inventory());
        assert_eq!(client.calls(), vec!["10.0.0.1", "10.0.0.2"]);
    }
}
