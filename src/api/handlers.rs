//! HTTP API handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use super::error::{ApiError, Dependency, ErrorBody};
use crate::guard::TableGuard;
use crate::item::Item;
use crate::metrics;
use crate::store::{ItemStore, WriteAck};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backing store.
    pub store: Arc<dyn ItemStore>,
    /// Provisioning guard for the backing table.
    pub guard: Arc<TableGuard>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(store: Arc<dyn ItemStore>, guard: Arc<TableGuard>) -> Self {
        Self {
            store,
            guard,
            metrics: None,
        }
    }

    /// Expose metrics from the given recorder on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    async fn ensure_table(&self) -> Result<(), ApiError> {
        self.guard
            .ensure(self.store.as_ref())
            .await
            .map_err(ApiError::dependency(Dependency::Table))
    }
}

/// Successful create response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateItemResponse {
    /// Human-readable outcome.
    pub message: String,
    /// The stored item, as received.
    pub data: Item,
    /// Store acknowledgment.
    pub response: WriteAck,
}

/// Successful list response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListItemsResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Every item in the table.
    pub items: Vec<Item>,
    /// Number of items.
    pub count: usize,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the backing table has been verified.
    pub ready: bool,
    /// Backing table name.
    pub table: String,
}

/// Store an item, creating the table first if needed.
#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    request_body = Item,
    responses(
        (status = 200, description = "Item stored", body = CreateItemResponse),
        (status = 400, description = "Body is not an object with a non-empty string id", body = ErrorBody),
        (status = 500, description = "Table provisioning or write failed", body = ErrorBody)
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<CreateItemResponse>, ApiError> {
    let Json(body) = payload?;
    let item = Item::try_from(body)?;

    state.ensure_table().await?;

    let response = state
        .store
        .put_item(state.guard.table_name(), &item)
        .await
        .map_err(ApiError::dependency(Dependency::Write))?;

    metrics::inc_items_created();
    info!(id = item.id(), "Item stored");

    Ok(Json(CreateItemResponse {
        message: "Data successfully sent to DynamoDB".to_string(),
        data: item,
        response,
    }))
}

/// Return every item in the table.
#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    responses(
        (status = 200, description = "All items", body = ListItemsResponse),
        (status = 500, description = "Table provisioning or scan failed", body = ErrorBody)
    )
)]
pub async fn list_items(State(state): State<AppState>) -> Result<Json<ListItemsResponse>, ApiError> {
    state.ensure_table().await?;

    let items = state
        .store
        .scan(state.guard.table_name())
        .await
        .map_err(ApiError::dependency(Dependency::Read))?;

    metrics::add_items_listed(items.len());
    info!(count = items.len(), "Items listed");

    Ok(Json(ListItemsResponse {
        message: "Data successfully retrieved from DynamoDB".to_string(),
        count: items.len(),
        items,
    }))
}

/// Health check handler - always returns 200.
#[utoipa::path(get, path = "/health", tag = "Health", responses((status = 200, body = HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once the table is verified, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Table verified", body = ReadyResponse),
        (status = 503, description = "Table not verified yet", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.guard.is_ready();

    let response = ReadyResponse {
        ready: is_ready,
        table: state.guard.table_name().to_string(),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus scrape endpoint.
pub async fn metrics_text(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
