use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API error type
///
/// Only transport-level failures become HTTP errors; everything the
/// scheduler should see is reported inside a 200 filter result.
#[derive(Debug)]
pub enum ApiError {
    /// Invalid input (400)
    BadRequest(String),

    /// Internal server error (500)
    Internal(String),
}

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, message).into_response()
    }
}

impl From<rdmafit_core::RdmafitError> for ApiError {
    fn from(err: rdmafit_core::RdmafitError) -> Self {
        use rdmafit_core::RdmafitError;

        match err {
            RdmafitError::InvalidRequest { .. } => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}
