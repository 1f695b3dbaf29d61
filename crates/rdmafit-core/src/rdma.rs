use crate::error::{RdmafitError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pod annotation holding the JSON list of requested RDMA interfaces
pub const RDMA_REQUIREMENT_ANNOTATION: &str = "rdma_interfaces_required";

/// One requested RDMA interface (an SR-IOV virtual function) with its
/// transmit-rate bounds in Mbps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdmaInterfaceRequest {
    #[serde(default)]
    pub min_tx_rate: u32,
    #[serde(default)]
    pub max_tx_rate: u32,
}

impl RdmaInterfaceRequest {
    pub fn new(min_tx_rate: u32, max_tx_rate: u32) -> Self {
        Self {
            min_tx_rate,
            max_tx_rate,
        }
    }
}

/// A physical function as reported by a node's RDMA hardware daemon
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Total number of virtual functions
    pub capacity_vfs: u32,
    /// Virtual functions already handed out
    pub used_vfs: u32,
    /// Total transmit bandwidth in Mbps
    pub capacity_tx_rate: u32,
    /// Bandwidth already reserved by running pods
    pub used_tx_rate: u32,
}

impl PhysicalFunction {
    pub fn new(capacity_vfs: u32, used_vfs: u32, capacity_tx_rate: u32, used_tx_rate: u32) -> Self {
        Self {
            name: None,
            capacity_vfs,
            used_vfs,
            capacity_tx_rate,
            used_tx_rate,
        }
    }

    /// Virtual function slots still free
    pub fn free_vfs(&self) -> u32 {
        self.capacity_vfs.saturating_sub(self.used_vfs)
    }

    /// Transmit bandwidth still free
    pub fn free_tx_rate(&self) -> u32 {
        self.capacity_tx_rate.saturating_sub(self.used_tx_rate)
    }
}

/// Live RDMA inventory of one node
pub type NodeInventory = Vec<PhysicalFunction>;

/// RDMA requirement of a pod, decoded from its annotations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Annotation absent or empty; the pod needs no RDMA interfaces
    None,
    /// Annotation present but not a valid interface list
    Malformed(String),
    /// Requested interfaces, in annotation order
    Interfaces(Vec<RdmaInterfaceRequest>),
}

impl Requirement {
    /// Read the requirement from a pod's annotation map
    pub fn from_annotations(annotations: Option<&BTreeMap<String, String>>) -> Self {
        let raw = annotations
            .and_then(|a| a.get(RDMA_REQUIREMENT_ANNOTATION))
            .map(String::as_str)
            .unwrap_or_default();

        if raw.is_empty() {
            return Requirement::None;
        }

        match parse_requirement(raw) {
            Ok(requests) => Requirement::Interfaces(requests),
            Err(e) => Requirement::Malformed(e.to_string()),
        }
    }
}

/// Parse the JSON interface list stored in the requirement annotation
pub fn parse_requirement(raw: &str) -> Result<Vec<RdmaInterfaceRequest>> {
    serde_json::from_str(raw)
        .map_err(|e| RdmafitError::malformed_requirement(raw, e.to_string()))
}
