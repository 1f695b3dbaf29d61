// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(scheduler::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        message: String,
        suggestion: String,
    },

    /// A node evaluation task failed without producing an outcome
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(scheduler::internal_error),
        help("This is likely a bug. Please report it")
    )]
    InternalError { message: String },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Failure to read a node's RDMA inventory
///
/// Never escapes a node probe task: the prober turns it into a rejection
/// reason for that node.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Node reports no InternalIP/InternalDNS address
    #[error("Node has no internal address to probe")]
    #[diagnostic(
        code(scheduler::probe::no_internal_address),
        help("The node's status.addresses must include an InternalIP or InternalDNS entry")
    )]
    NoInternalAddress,

    /// Connection failed or the daemon answered with an error status
    #[error("Inventory daemon at {address} unreachable: {message}")]
    #[diagnostic(
        code(scheduler::probe::unreachable),
        help("Check that the RDMA hardware DaemonSet is running on the node")
    )]
    Unreachable { address: String, message: String },

    /// Daemon did not answer in time
    #[error("Inventory query to {address} timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(scheduler::probe::timeout),
        help("Raise --probe-timeout-ms if the daemon is slow to respond")
    )]
    Timeout { address: String, timeout_ms: u64 },

    /// Daemon answered with something other than a physical function list
    #[error("Inventory daemon at {address} returned a malformed response: {message}")]
    #[diagnostic(
        code(scheduler::probe::malformed_response),
        help("The daemon must return a JSON array of physical functions")
    )]
    MalformedResponse { address: String, message: String },

    /// Every internal address was tried and none answered
    #[error("All {attempts} internal addresses failed; last error: {last_error}")]
    #[diagnostic(code(scheduler::probe::all_addresses_failed))]
    AllAddressesFailed { attempts: usize, last_error: String },
}

impl ProbeError {
    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn timeout(address: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            address: address.into(),
            timeout_ms,
        }
    }

    pub fn malformed_response(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            address: address.into(),
            message: message.into(),
        }
    }
}
