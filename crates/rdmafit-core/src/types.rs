use k8s_openapi::api::core::v1::{Node, NodeAddress, Pod};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Node address types reachable from inside the cluster
pub const INTERNAL_ADDRESS_TYPES: [&str; 2] = ["InternalIP", "InternalDNS"];

/// Node list as carried by the scheduler extender protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeList {
    #[serde(default, alias = "Items", deserialize_with = "null_as_default")]
    pub items: Vec<Node>,
}

impl NodeList {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }
}

/// Arguments the scheduler POSTs to a filter extender
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtenderArgs {
    /// Pod being scheduled
    #[serde(alias = "Pod")]
    pub pod: Pod,
    /// Candidate nodes
    #[serde(default, alias = "Nodes", skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    /// Node names sent by node-cache-capable schedulers (not used for probing)
    #[serde(
        default,
        alias = "NodeNames",
        rename = "nodenames",
        skip_serializing_if = "Option::is_none"
    )]
    pub node_names: Option<Vec<String>>,
}

impl ExtenderArgs {
    /// Candidate nodes, empty when the scheduler sent none
    pub fn candidate_nodes(&self) -> &[Node] {
        self.nodes.as_ref().map(|n| n.items.as_slice()).unwrap_or(&[])
    }

    /// Name of the pod, for logging
    pub fn pod_name(&self) -> &str {
        self.pod.metadata.name.as_deref().unwrap_or("unknown")
    }
}

/// Filter extender response
///
/// `failedNodes` is always rendered as an object and `error` as a string,
/// so the scheduler never sees `null` for either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtenderFilterResult {
    /// Nodes the pod may be scheduled on
    #[serde(default, alias = "Nodes", skip_serializing_if = "Option::is_none")]
    pub nodes: Option<NodeList>,
    /// Rejected node name to rejection reason
    #[serde(default, alias = "FailedNodes", deserialize_with = "null_as_default")]
    pub failed_nodes: BTreeMap<String, String>,
    /// Request-level error, empty on success
    #[serde(default, alias = "Error", deserialize_with = "null_as_default")]
    pub error: String,
}

impl ExtenderFilterResult {
    /// Successful result
    pub fn filtered(nodes: Vec<Node>, failed_nodes: BTreeMap<String, String>) -> Self {
        Self {
            nodes: Some(NodeList::new(nodes)),
            failed_nodes,
            error: String::new(),
        }
    }

    /// Request-level failure: no nodes, no per-node reasons
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            nodes: None,
            failed_nodes: BTreeMap::new(),
            error: message.into(),
        }
    }

    /// Names of the schedulable nodes, in response order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes
            .as_ref()
            .map(|list| list.items.iter().map(node_name).collect())
            .unwrap_or_default()
    }
}

/// Name of a node, "unknown" when unset
pub fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("unknown")
}

/// All addresses reported in a node's status
pub fn node_addresses(node: &Node) -> &[NodeAddress] {
    node.status
        .as_ref()
        .and_then(|s| s.addresses.as_deref())
        .unwrap_or(&[])
}

/// Whether the address is reachable from inside the cluster
pub fn is_internal_address(address: &NodeAddress) -> bool {
    INTERNAL_ADDRESS_TYPES.contains(&address.type_.as_str())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
