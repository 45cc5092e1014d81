//! HTTP API exposing the GLM quota

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::error::QuotaError;
use crate::models::PublishedQuota;
use crate::quota::{QuotaService, UsageKind};
use crate::terminal::format_status_line;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QuotaService>,
}

/// Build the route table
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .route("/quota/glm", get(handle_glm_quota))
        .route("/quota/glm/status", get(handle_glm_status))
        .route("/quota/glm/:pattern", get(handle_glm_filtered))
        .route("/usage/glm/model", get(handle_model_usage))
        .route("/usage/glm/tool", get(handle_tool_usage))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Quota API server started at http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Quota API server stopped");
    Ok(())
}

/// Keep models whose name contains any of `patterns`
pub fn filter_models(quota: &PublishedQuota, patterns: &[&str]) -> PublishedQuota {
    PublishedQuota {
        models: quota
            .models
            .iter()
            .filter(|model| patterns.iter().any(|p| model.name.contains(p)))
            .cloned()
            .collect(),
        last_updated: quota.last_updated,
        is_forbidden: quota.is_forbidden,
    }
}

/// Error body returned to API consumers
pub struct ApiError(QuotaError);

impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            QuotaError::Configuration(_) | QuotaError::UnrecognizedBaseUrl(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            QuotaError::UpstreamStatus { .. }
            | QuotaError::Decode(_)
            | QuotaError::MalformedResponse(_)
            | QuotaError::Network(_) => StatusCode::BAD_GATEWAY,
            QuotaError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_cancelled() {
            debug!("Quota request cancelled");
        } else {
            error!(status = status.as_u16(), "Quota request failed: {}", self.0);
        }

        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Token cancelled when the handler future is dropped
fn request_token() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

async fn fetch_quota(state: &AppState) -> Result<PublishedQuota, ApiError> {
    let (cancel, _guard) = request_token();
    Ok(state.service.get_glm_quota(&cancel).await?)
}

async fn handle_glm_quota(State(state): State<AppState>) -> Result<Response, ApiError> {
    let quota = fetch_quota(&state).await?;
    Ok(Json(serde_json::json!({ "quota": quota })).into_response())
}

async fn handle_glm_filtered(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Response, ApiError> {
    let quota = fetch_quota(&state).await?;
    let filtered = filter_models(&quota, &[pattern.as_str()]);
    Ok(Json(serde_json::json!({ "quota": filtered })).into_response())
}

async fn handle_glm_status(State(state): State<AppState>) -> Result<Response, ApiError> {
    let quota = fetch_quota(&state).await?;
    let line = format_status_line(&quota, Utc::now());
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], line).into_response())
}

async fn usage(state: &AppState, kind: UsageKind) -> Result<Response, ApiError> {
    let (cancel, _guard) = request_token();
    let payload = state.service.get_usage(&cancel, kind).await?;
    Ok(Json(serde_json::json!({ "usage": payload })).into_response())
}

async fn handle_model_usage(State(state): State<AppState>) -> Result<Response, ApiError> {
    usage(&state, UsageKind::Model).await
}

async fn handle_tool_usage(State(state): State<AppState>) -> Result<Response, ApiError> {
    usage(&state, UsageKind::Tool).await
}

/// Health check handler
async fn health_check_handler() -> Response {
    Json(serde_json::json!({
        "status": "ok"
    }))
    .into_response()
}
