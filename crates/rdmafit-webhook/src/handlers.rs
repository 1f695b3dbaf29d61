use crate::{ApiError, AppState, Result};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use rdmafit_core::{decode_extender_args, to_json_vec, ExtenderFilterResult};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// POST /scheduler/rdma_scheduling
///
/// Filter callback of the scheduler extender protocol. An empty body is the
/// only input rejected at the HTTP level; decode problems are reported in
/// the `error` field of a 200 response.
pub async fn filter_nodes(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response> {
    if body.is_empty() {
        info!("Got empty http request");
        return Err(ApiError::BadRequest("Request body was empty.".to_string()));
    }

    let request_id = Uuid::new_v4();

    let result = match decode_extender_args(&body) {
        Ok(args) => {
            let span = info_span!("filter", %request_id, pod = %args.pod_name());
            state.filter.filter(&args).instrument(span).await
        }
        Err(e) => {
            warn!(%request_id, "Got request with malformed scheduler extender arguments: {}", e);
            ExtenderFilterResult::error(e.to_string())
        }
    };

    let payload = to_json_vec(&result).map_err(|e| {
        error!(%request_id, "Failed to serialize filter result: {}", e);
        ApiError::from(e)
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], payload).into_response())
}

/// Health check endpoint
pub async fn healthz() -> &'static str {
    "ok"
}

/// Liveness probe
pub async fn livez() -> &'static str {
    "ok"
}

/// Readiness probe
pub async fn readyz() -> &'static str {
    "ok"
}
