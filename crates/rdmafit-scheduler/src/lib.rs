//! Rdmafit Scheduler - RDMA-aware node filtering
//!
//! This crate provides:
//! - Node inventory probing (first reachable internal address wins)
//! - Placement of requested RDMA interfaces onto physical functions
//! - Concurrent per-node probing with one outcome per node
//! - Best-fit selection among feasible nodes
//! - The filter decision for a scheduler extender request

pub mod error;
pub mod filter;
pub mod mock;
pub mod placement;
pub mod probe;
pub mod prober;
pub mod select;
pub mod types;

// Re-export commonly used types
pub use error::{ProbeError, Result, SchedulerError};
pub use filter::RdmaFilter;
pub use mock::MockInventoryClient;
pub use placement::{BestFitPlacement, Placement, PlacementStrategy};
pub use probe::{probe_node, HttpInventoryClient, InventoryClient};
pub use prober::NodeProber;
pub use select::{AllFeasible, SelectionKind, SelectionPolicy, TightestFit};
pub use types::{NodeOutcome, ProbeConfig, Selection};
