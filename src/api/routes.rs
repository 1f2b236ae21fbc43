//! HTTP API route definitions.

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::error::ErrorBody;
use super::handlers::{
    create_item, health, list_items, metrics_text, ready, AppState, CreateItemResponse,
    HealthResponse, ListItemsResponse, ReadyResponse,
};
use crate::error::AppError;
use crate::item::Item;
use crate::store::WriteAck;

/// OpenAPI document for the items API.
#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::create_item,
        super::handlers::list_items,
        super::handlers::health,
        super::handlers::ready
    ),
    components(schemas(
        Item,
        WriteAck,
        CreateItemResponse,
        ListItemsResponse,
        ErrorBody,
        HealthResponse,
        ReadyResponse
    )),
    info(
        title = "Items API",
        description = "Create and list items in a lazily provisioned DynamoDB table",
        version = "1.0.0"
    ),
    tags(
        (name = "Items", description = "Item create/list endpoints"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

/// CORS policy allowing exactly one origin, with credentials.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(origin).map_err(|_| AppError::InvalidOrigin {
        origin: origin.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Create the API router.
pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        // Items
        .route("/api/items", get(list_items).post(create_item))
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_text))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
