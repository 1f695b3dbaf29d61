use crate::error::SchedulerError;
use crate::placement::PlacementStrategy;
use crate::probe::{probe_node, InventoryClient};
use crate::types::NodeOutcome;
use rdmafit_core::{node_addresses, node_name, Node, NodeAddress, RdmaInterfaceRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn, Instrument};

/// Probes every candidate node concurrently and evaluates its inventory
///
/// One task is spawned per node; each reports exactly one `NodeOutcome`
/// through a bounded channel. A slow or unreachable node only degrades its
/// own outcome.
pub struct NodeProber {
    client: Arc<dyn InventoryClient>,
    placement: Arc<dyn PlacementStrategy>,
    timeout: Duration,
}

impl NodeProber {
    pub fn new(
        client: Arc<dyn InventoryClient>,
        placement: Arc<dyn PlacementStrategy>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            placement,
            timeout,
        }
    }

    /// Name of the placement strategy applied to each inventory
    pub fn placement_name(&self) -> &str {
        self.placement.name()
    }

    /// Probe all nodes and return one outcome per node, in node order
    pub async fn probe_all(
        &self,
        nodes: &[Node],
        requests: &[RdmaInterfaceRequest],
    ) -> Vec<NodeOutcome> {
        let total = nodes.len();
        if total == 0 {
            return Vec::new();
        }

        let (tx, mut rx) = mpsc::channel(total);
        let requests: Arc<[RdmaInterfaceRequest]> = requests.into();

        for (index, node) in nodes.iter().enumerate() {
            let tx = tx.clone();
            let client = self.client.clone();
            let placement = self.placement.clone();
            let requests = requests.clone();
            let timeout = self.timeout;
            let name = node_name(node).to_string();
            let addresses = node_addresses(node).to_vec();

            tokio::spawn(
                async move {
                    let outcome = evaluate_node(
                        index,
                        name,
                        &addresses,
                        requests,
                        client.as_ref(),
                        placement,
                        timeout,
                    )
                    .await;
                    // The receiver only disappears if the request was abandoned
                    let _ = tx.send(outcome).await;
                }
                .in_current_span(),
            );
        }
        drop(tx);

        let mut slots: Vec<Option<NodeOutcome>> = vec![None; total];
        let mut received = 0;
        while received < total {
            match rx.recv().await {
                Some(outcome) => {
                    let index = outcome.index;
                    if slots[index].replace(outcome).is_none() {
                        received += 1;
                    }
                }
                // Every sender is gone: some task died before reporting
                None => break,
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    let name = node_name(&nodes[index]);
                    let err = SchedulerError::internal_error(format!(
                        "probe task for node {} exited without reporting",
                        name
                    ));
                    error!("{}", err);
                    NodeOutcome::unreachable(index, name)
                })
            })
            .collect()
    }
}

async fn evaluate_node(
    index: usize,
    name: String,
    addresses: &[NodeAddress],
    requests: Arc<[RdmaInterfaceRequest]>,
    client: &dyn InventoryClient,
    placement: Arc<dyn PlacementStrategy>,
    timeout: Duration,
) -> NodeOutcome {
    let inventory = match probe_node(client, addresses, timeout).await {
        Ok(inventory) => inventory,
        Err(e) => {
            warn!("Node {}: {}", name, e);
            return NodeOutcome::unreachable(index, name);
        }
    };

    // Placement is CPU bound and must not stall the async workers
    let functions = inventory.len();
    let placed =
        tokio::task::spawn_blocking(move || placement.place(&requests, &inventory)).await;
    let result = match placed {
        Ok(result) => result,
        Err(e) => {
            let err = SchedulerError::internal_error(format!(
                "placement for node {} failed: {}",
                name, e
            ));
            error!("{}", err);
            return NodeOutcome::unreachable(index, name);
        }
    };

    debug!(
        "Node {}: {} physical functions, feasible={}, residual={}",
        name,
        functions,
        result.feasible,
        result.residual
    );

    if result.feasible {
        NodeOutcome::feasible(index, name, result.residual)
    } else {
        NodeOutcome::insufficient(index, name, result.residual)
    }
}
