use crate::error::ProbeError;
use crate::probe::InventoryClient;
use async_trait::async_trait;
use rdmafit_core::NodeInventory;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
struct MockResponse {
    result: Result<NodeInventory, ProbeError>,
    delay: Option<Duration>,
}

/// In-memory inventory client for tests and local development
///
/// Addresses without a configured response behave like a host with nothing
/// listening. Every query is recorded so tests can assert which addresses
/// were contacted.
#[derive(Clone, Default)]
pub struct MockInventoryClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockInventoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries to `address` with `inventory`
    pub fn respond(&self, address: &str, inventory: NodeInventory) {
        self.insert(address, Ok(inventory), None);
    }

    /// Answer queries to `address` with `inventory` after `delay`
    pub fn respond_after(&self, address: &str, inventory: NodeInventory, delay: Duration) {
        self.insert(address, Ok(inventory), Some(delay));
    }

    /// Fail queries to `address` with `error`
    pub fn fail(&self, address: &str, error: ProbeError) {
        self.insert(address, Err(error), None);
    }

    /// Addresses queried so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn insert(&self, address: &str, result: Result<NodeInventory, ProbeError>, delay: Option<Duration>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(address.to_string(), MockResponse { result, delay });
        }
    }
}

#[async_trait]
impl InventoryClient for MockInventoryClient {
    async fn query(&self, address: &str) -> Result<NodeInventory, ProbeError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(address.to_string());
        }

        let response = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(address).cloned());

        let Some(response) = response else {
            debug!("Mock: no inventory configured for {}", address);
            return Err(ProbeError::unreachable(address, "connection refused"));
        };

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        debug!("Mock: answering inventory query for {}", address);
        response.result
    }
}
