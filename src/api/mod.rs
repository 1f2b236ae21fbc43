//! HTTP API module for the items endpoints, health probes and metrics.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ErrorBody};
pub use handlers::{AppState, CreateItemResponse, ListItemsResponse};
pub use routes::{cors_layer, create_router, ApiDoc};
