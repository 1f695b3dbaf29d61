use crate::placement::{BestFitPlacement, PlacementStrategy};
use crate::probe::InventoryClient;
use crate::prober::NodeProber;
use crate::select::{SelectionKind, SelectionPolicy};
use crate::types::{ProbeConfig, REASON_MALFORMED_REQUIREMENT};
use rdmafit_core::{node_addresses, node_name, ExtenderArgs, ExtenderFilterResult, Requirement};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// RDMA filter for one scheduler extender request
///
/// Reads the pod's requirement annotation, then either passes every node
/// (no requirement), rejects every node (malformed requirement) or probes
/// all nodes and applies the selection policy.
pub struct RdmaFilter {
    prober: NodeProber,
    policy: Box<dyn SelectionPolicy>,
}

impl RdmaFilter {
    pub fn new(prober: NodeProber, policy: Box<dyn SelectionPolicy>) -> Self {
        Self { prober, policy }
    }

    /// Filter with the default placement strategy
    pub fn with_client(
        client: Arc<dyn InventoryClient>,
        config: &ProbeConfig,
        selection: SelectionKind,
    ) -> Self {
        let placement: Arc<dyn PlacementStrategy> = Arc::new(BestFitPlacement);
        Self::new(
            NodeProber::new(client, placement, config.timeout),
            selection.policy(),
        )
    }

    /// Name of the selection policy in use
    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// Name of the placement strategy in use
    pub fn placement_name(&self) -> &str {
        self.prober.placement_name()
    }

    /// Decide which candidate nodes can host the pod
    pub async fn filter(&self, args: &ExtenderArgs) -> ExtenderFilterResult {
        let nodes = args.candidate_nodes();

        info!(
            "Got request to schedule pod {} on {} candidate nodes",
            args.pod_name(),
            nodes.len()
        );
        for node in nodes {
            debug!("Candidate {}: {:?}", node_name(node), node_addresses(node));
        }

        let requests = match Requirement::from_annotations(args.pod.metadata.annotations.as_ref()) {
            Requirement::None => {
                info!("Pod doesn't require any RDMA interfaces, no nodes filtered out");
                return ExtenderFilterResult::filtered(nodes.to_vec(), BTreeMap::new());
            }
            Requirement::Malformed(e) => {
                warn!("Pod's RDMA requirement annotation is malformed: {}", e);
                let mut failed = BTreeMap::new();
                for node in nodes {
                    record_failure(&mut failed, node_name(node), REASON_MALFORMED_REQUIREMENT);
                }
                return ExtenderFilterResult::filtered(Vec::new(), failed);
            }
            Requirement::Interfaces(requests) => requests,
        };

        info!("Pod's RDMA requirements: {:?}", requests);

        let outcomes = self.prober.probe_all(nodes, &requests).await;
        let selection = self.policy.select(&outcomes);

        let mut schedulable = Vec::with_capacity(selection.schedulable.len());
        for i in selection.schedulable {
            let outcome = &outcomes[i];
            info!("{}: eligible (residual {})", outcome.node_name, outcome.residual);
            schedulable.push(nodes[outcome.index].clone());
        }

        let mut failed = BTreeMap::new();
        for (i, reason) in selection.rejected {
            let outcome = &outcomes[i];
            info!("{}: not eligible", outcome.node_name);
            record_failure(&mut failed, &outcome.node_name, reason);
        }

        ExtenderFilterResult::filtered(schedulable, failed)
    }
}

/// Add a rejection to `failedNodes`, keeping the first reason on a name clash
///
/// The map is keyed by node name, so nodes without a name all share one key.
/// Returns false when an entry was already present.
fn record_failure(
    failed: &mut BTreeMap<String, String>,
    name: &str,
    reason: impl Into<String>,
) -> bool {
    if failed.contains_key(name) {
        warn!(
            "Duplicate node name {} in candidate list, rejection reason dropped",
            name
        );
        return false;
    }
    failed.insert(name.to_string(), reason.into());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockInventoryClient;
    use crate::types::{REASON_INSUFFICIENT, REASON_NOT_TIGHTEST_FIT, REASON_UNREACHABLE};
    use k8s_openapi::api::core::v1::NodeStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use rdmafit_core::{Node, NodeAddress, NodeList, PhysicalFunction, Pod, RDMA_REQUIREMENT_ANNOTATION};

    fn make_node(name: &str, ip: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                addresses: Some(vec![NodeAddress {
                    address: ip.to_string(),
                    type_: "InternalIP".to_string(),
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn make_args(annotation: Option<&str>, nodes: Vec<Node>) -> ExtenderArgs {
        let mut pod = Pod::default();
        pod.metadata.name = Some("mpi-worker".to_string());
        if let Some(value) = annotation {
            let mut annotations = BTreeMap::new();
            annotations.insert(RDMA_REQUIREMENT_ANNOTATION.to_string(), value.to_string());
            pod.metadata.annotations = Some(annotations);
        }
        ExtenderArgs {
            pod,
            nodes: Some(NodeList::new(nodes)),
            node_names: None,
        }
    }

    fn four_nodes() -> Vec<Node> {
        (0..4)
            .map(|i| make_node(&format!("node{}", i), &format!("10.0.0.{}", i)))
            .collect()
    }

    fn make_filter(client: &MockInventoryClient, selection: SelectionKind) -> RdmaFilter {
        RdmaFilter::with_client(Arc::new(client.clone()), &ProbeConfig::default(), selection)
    }

    #[tokio::test]
    async fn test_no_requirement_passes_every_node() {
        let client = MockInventoryClient::new();
        let filter = make_filter(&client, SelectionKind::TightestFit);

        for annotation in [None, Some("")] {
            let result = filter.filter(&make_args(annotation, four_nodes())).await;

            assert_eq!(result.node_names(), vec!["node0", "node1", "node2", "node3"]);
            assert!(result.failed_nodes.is_empty());
            assert!(result.error.is_empty());
        }
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_requirement_rejects_every_node() {
        let client = MockInventoryClient::new();
        let filter = make_filter(&client, SelectionKind::TightestFit);

        let result = filter
            .filter(&make_args(Some("[{min_tx_rate: 1"), four_nodes()))
            .await;

        assert!(result.node_names().is_empty());
        assert_eq!(result.failed_nodes.len(), 4);
        assert!(result
            .failed_nodes
            .values()
            .all(|r| r == REASON_MALFORMED_REQUIREMENT));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tightest_nodes_are_selected() {
        let client = MockInventoryClient::new();
        // Free bandwidth 6, 4, 4, 8 minus a 1 Mbps request leaves 5, 3, 3, 7
        for (i, free) in [6, 4, 4, 8].into_iter().enumerate() {
            client.respond(
                &format!("10.0.0.{}", i),
                vec![PhysicalFunction::new(4, 0, free, 0)],
            );
        }
        let filter = make_filter(&client, SelectionKind::TightestFit);

        let result = filter
            .filter(&make_args(
                Some(r#"[{"min_tx_rate": 1, "max_tx_rate": 2}]"#),
                four_nodes(),
            ))
            .await;

        assert_eq!(result.node_names(), vec!["node1", "node2"]);
        assert_eq!(result.failed_nodes.len(), 2);
        assert_eq!(result.failed_nodes["node0"], REASON_NOT_TIGHTEST_FIT);
        assert_eq!(result.failed_nodes["node3"], REASON_NOT_TIGHTEST_FIT);
        assert!(result.error.is_empty());
    }

    #[tokio::test]
    async fn test_all_feasible_policy_offers_every_fitting_node() {
        let client = MockInventoryClient::new();
        for (i, free) in [6, 4, 4, 8].into_iter().enumerate() {
            client.respond(
                &format!("10.0.0.{}", i),
                vec![PhysicalFunction::new(4, 0, free, 0)],
            );
        }
        let filter = make_filter(&client, SelectionKind::AllFeasible);

        let result = filter
            .filter(&make_args(Some(r#"[{"min_tx_rate": 5, "max_tx_rate": 0}]"#), four_nodes()))
            .await;

        assert_eq!(result.node_names(), vec!["node0", "node3"]);
        assert_eq!(result.failed_nodes["node1"], REASON_INSUFFICIENT);
        assert_eq!(result.failed_nodes["node2"], REASON_INSUFFICIENT);
    }

    #[tokio::test]
    async fn test_nothing_feasible_rejects_every_node_with_reason() {
        let client = MockInventoryClient::new();
        client.respond("10.0.0.0", vec![PhysicalFunction::new(4, 4, 10000, 0)]);
        client.respond("10.0.0.1", vec![PhysicalFunction::new(4, 0, 100, 0)]);
        let filter = make_filter(&client, SelectionKind::TightestFit);

        let result = filter
            .filter(&make_args(Some(r#"[{"min_tx_rate": 500, "max_tx_rate": 1000}]"#), four_nodes()))
            .await;

        assert!(result.node_names().is_empty());
        assert_eq!(result.failed_nodes.len(), 4);
        assert_eq!(result.failed_nodes["node0"], REASON_INSUFFICIENT);
        assert_eq!(result.failed_nodes["node1"], REASON_INSUFFICIENT);
        assert_eq!(result.failed_nodes["node2"], REASON_UNREACHABLE);
        assert_eq!(result.failed_nodes["node3"], REASON_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_no_candidate_nodes() {
        let client = MockInventoryClient::new();
        let filter = make_filter(&client, SelectionKind::TightestFit);

        let result = filter
            .filter(&make_args(Some(r#"[{"min_tx_rate": 1, "max_tx_rate": 1}]"#), vec![]))
            .await;

        assert!(result.node_names().is_empty());
        assert!(result.failed_nodes.is_empty());
        assert_eq!(filter.policy_name(), "TightestFit");
        assert_eq!(filter.placement_name(), "BestFitPlacement");
    }

    #[test]
    fn test_record_failure_keeps_first_reason_on_clash() {
        let mut failed = BTreeMap::new();

        assert!(record_failure(&mut failed, "unknown", REASON_UNREACHABLE));
        assert!(!record_failure(&mut failed, "unknown", REASON_INSUFFICIENT));
        assert!(record_failure(&mut failed, "node-a", REASON_INSUFFICIENT));

        assert_eq!(failed.len(), 2);
        assert_eq!(failed["unknown"], REASON_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_unnamed_nodes_share_one_failure_entry() {
        let mut unnamed = make_node("x", "10.0.0.1");
        unnamed.metadata.name = None;
        let args = make_args(
            Some("not json"),
            vec![unnamed.clone(), unnamed, make_node("node-b", "10.0.0.2")],
        );
        let filter = make_filter(&MockInventoryClient::new(), SelectionKind::TightestFit);

        let result = filter.filter(&args).await;

        assert!(result.node_names().is_empty());
        assert_eq!(result.failed_nodes.len(), 2);
        assert!(result.failed_nodes.contains_key("unknown"));
        assert!(result.failed_nodes.contains_key("node-b"));
    }
}
