//! HTTP control API.
//!
//! Every route maps to exactly one [`ControlPlane`] operation. Handlers never
//! panic: each failure is logged and turned into a JSON error body
//! `{status, message, completed?}`.
//!
//! | Route               | Operation                       |
//! |---------------------|---------------------------------|
//! | `POST /load`        | attach to interfaces            |
//! | `POST /unload`      | detach from interfaces or `all` |
//! | `POST /block`       | block / allow a CIDR            |
//! | `GET  /status`      | aggregated report               |
//! | `POST /flushblocked`| clear the blocklist             |
//! | `POST /flushstatus` | clear the counters              |

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use xdpwall_core::api::{BlockRequest, ErrorBody, LoadRequest, StatusReport, UnloadRequest};
use xdpwall_core::error::{ControlError, ErrorClass};
use xdpwall_ebpf_engine::ControlPlane;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub control: Arc<ControlPlane>,
}

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/load", post(load_handler))
        .route("/unload", post(unload_handler))
        .route("/block", post(block_handler))
        .route("/status", get(status_handler))
        .route("/flushblocked", post(flush_blocked_handler))
        .route("/flushstatus", post(flush_status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP status for an error class.
///
/// `NotFound` is reported as 404 so callers can tell "already allowed"
/// apart from a kernel table failure.
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Input | ErrorClass::Resource => StatusCode::BAD_REQUEST,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
        ErrorClass::Environment => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    completed: Vec<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            completed: Vec::new(),
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        Self {
            status: status_for(err.class()),
            completed: err.completed().to_vec(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("bad request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), message = %self.message, "request failed");
        } else {
            tracing::warn!(status = self.status.as_u16(), message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            status: self.status.as_u16(),
            message: self.message,
            completed: self.completed,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn load_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoadRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    if req.interfaces.trim().is_empty() || req.mode.is_empty() {
        return Err(ApiError::bad_request("interfaces and mode are required"));
    }

    let report = state.control.load(&req.interfaces, &req.mode).await?;
    tracing::info!(
        attached = ?report.attached,
        already_attached = ?report.already_attached,
        mode = %req.mode,
        "load completed"
    );
    Ok(StatusCode::OK)
}

async fn unload_handler(
    State(state): State<AppState>,
    payload: Result<Json<UnloadRequest>, JsonRejection>,
) -> Result<(StatusCode, String), ApiError> {
    let Json(req) = payload?;
    if req.interfaces.trim().is_empty() {
        return Err(ApiError::bad_request("interfaces is required"));
    }

    let report = state.control.unload(&req.interfaces).await?;
    tracing::info!(detached = ?report.detached, not_loaded = ?report.not_loaded, "unload completed");

    let body: String = report
        .not_loaded
        .iter()
        .map(|name| format!("no XDP code loaded to the interface: {name}\n"))
        .collect();
    Ok((StatusCode::OK, body))
}

async fn block_handler(
    State(state): State<AppState>,
    payload: Result<Json<BlockRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    state
        .control
        .set_action(&req.target, &req.action, req.timeout)
        .await?;
    Ok(StatusCode::OK)
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.control.status().await)
}

async fn flush_blocked_handler(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let flushed = state.control.flush_blocked().await?;
    tracing::info!(count = flushed.len(), "blocklist flush completed");
    Ok(StatusCode::OK)
}

async fn flush_status_handler(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let flushed = state.control.flush_counters().await?;
    tracing::info!(count = flushed.len(), "counter flush completed");
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_http_status() {
        assert_eq!(status_for(ErrorClass::Input), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorClass::Resource), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorClass::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorClass::Environment),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn control_errors_keep_completed_items() {
        let err = ApiError::from(ControlError::DetachFailure {
            interface: "eth1".to_owned(),
            reason: "busy".to_owned(),
            completed: vec!["eth0".to_owned()],
        });
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.completed, ["eth0"]);
    }
}
