use std::time::Duration;

/// Rejection reason for a node that could be probed but lacks capacity
pub const REASON_INSUFFICIENT: &str =
    "RDMA Scheduler Extension: Node did not have enough free RDMA resources.";

/// Rejection reason for a node whose inventory could not be read
pub const REASON_UNREACHABLE: &str =
    "RDMA Scheduler Extension: Unable to collect information on available RDMA resources for node.";

/// Rejection reason for every node when the pod annotation cannot be parsed
pub const REASON_MALFORMED_REQUIREMENT: &str =
    "RDMA Scheduler Extension: 'rdma_interfaces_required' field in pod YAML file is malformatted.";

/// Rejection reason for a feasible node that lost the best-fit tie-break
pub const REASON_NOT_TIGHTEST_FIT: &str =
    "RDMA Scheduler Extension: Node is not the tightest fit for the requested RDMA resources.";

/// Default port of the RDMA hardware inventory daemon
pub const DEFAULT_INVENTORY_PORT: u16 = 54005;

/// Default path of the inventory endpoint
pub const DEFAULT_INVENTORY_PATH: &str = "/getpfs";

/// Default per-address probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Configuration for reaching node inventory daemons
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Port the inventory daemon listens on
    pub port: u16,
    /// HTTP path of the inventory endpoint
    pub path: String,
    /// Bound on each individual address attempt
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_INVENTORY_PORT,
            path: DEFAULT_INVENTORY_PATH.to_string(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Result of probing and evaluating one candidate node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    /// Position of the node in the request's candidate list
    pub index: usize,
    /// Node name
    pub node_name: String,
    /// Whether the node can host the pod's RDMA interfaces
    pub schedulable: bool,
    /// Free bandwidth left after placement (lower is a tighter fit)
    pub residual: u64,
    /// Reason for rejection (if any)
    pub reason: Option<String>,
}

impl NodeOutcome {
    /// Node can host the pod
    pub fn feasible(index: usize, node_name: impl Into<String>, residual: u64) -> Self {
        Self {
            index,
            node_name: node_name.into(),
            schedulable: true,
            residual,
            reason: None,
        }
    }

    /// Node was reachable but lacks free RDMA resources
    pub fn insufficient(index: usize, node_name: impl Into<String>, residual: u64) -> Self {
        Self {
            index,
            node_name: node_name.into(),
            schedulable: false,
            residual,
            reason: Some(REASON_INSUFFICIENT.to_string()),
        }
    }

    /// Node inventory could not be read
    pub fn unreachable(index: usize, node_name: impl Into<String>) -> Self {
        Self {
            index,
            node_name: node_name.into(),
            schedulable: false,
            residual: 0,
            reason: Some(REASON_UNREACHABLE.to_string()),
        }
    }
}

/// Outcome of a selection policy, as indices into the outcome slice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Outcomes offered back to the scheduler
    pub schedulable: Vec<usize>,
    /// Outcomes rejected, with their reasons
    pub rejected: Vec<(usize, String)>,
}
