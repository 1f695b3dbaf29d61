// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for rdmafit operations
#[derive(Error, Debug, Diagnostic)]
pub enum RdmafitError {
    /// The extender request could not be decoded
    #[error("Invalid extender request: {message}")]
    #[diagnostic(
        code(rdmafit::invalid_request),
        help("The scheduler must POST ExtenderArgs JSON containing a pod and a node list")
    )]
    InvalidRequest {
        #[allow(unused)]
        message: String,
    },

    /// The pod's RDMA requirement annotation is not valid JSON
    #[error("Malformed RDMA requirement annotation '{annotation}': {message}")]
    #[diagnostic(
        code(rdmafit::malformed_requirement),
        help("Expected a JSON array such as [{{\"min_tx_rate\": 1000, \"max_tx_rate\": 2000}}]")
    )]
    MalformedRequirement {
        #[allow(unused)]
        annotation: String,
        #[allow(unused)]
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(rdmafit::serialization_error),
        help("Ensure the payload is valid JSON")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for rdmafit operations
pub type Result<T> = std::result::Result<T, RdmafitError>;

impl RdmafitError {
    /// Create an InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a MalformedRequirement error
    pub fn malformed_requirement(annotation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRequirement {
            annotation: annotation.into(),
            message: message.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
