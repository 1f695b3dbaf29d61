use rdmafit_scheduler::RdmaFilter;
use std::sync::Arc;

/// Shared application state
///
/// Holds only immutable collaborators; no request state survives a request.
#[derive(Clone)]
pub struct AppState {
    /// RDMA filter shared by all requests
    pub filter: Arc<RdmaFilter>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(filter: RdmaFilter) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }
}
