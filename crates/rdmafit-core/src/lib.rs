//! Rdmafit Core - Wire types for the RDMA scheduler extender
//!
//! This crate provides:
//! - Scheduler extender request/response types
//! - RDMA interface requests and physical function inventory
//! - Requirement annotation parsing
//! - Error types with miette diagnostics

pub mod error;
pub mod rdma;
pub mod types;

// Re-export commonly used types
pub use error::{RdmafitError, Result};
pub use rdma::{
    parse_requirement, NodeInventory, PhysicalFunction, RdmaInterfaceRequest, Requirement,
    RDMA_REQUIREMENT_ANNOTATION,
};
pub use types::{
    is_internal_address, node_addresses, node_name, ExtenderArgs, ExtenderFilterResult, NodeList,
};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, NodeAddress, Pod};

/// Serialize a value to JSON bytes
pub fn to_json_vec<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        RdmafitError::serialization_error(
            format!("Failed to serialize to JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Decode scheduler extender arguments from a request body
pub fn decode_extender_args(body: &[u8]) -> Result<ExtenderArgs> {
    serde_json::from_slice(body).map_err(|e| RdmafitError::invalid_request(e.to_string()))
}
