//! Static frontend server.
//!
//! Serves the browser bundle from the configured directory and a generated
//! `/config.js` that tells the script where the API lives.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{routing::get, Router};
use serde_json::Value;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;

#[derive(Clone)]
struct FrontendState {
    config_script: Arc<str>,
}

/// Script assigning the API base URL to `window.BACKEND_URL`.
pub fn config_script(backend_url: &str) -> String {
    format!(
        "window.BACKEND_URL = {};\n",
        Value::String(backend_url.to_string())
    )
}

async fn config_js(State(state): State<FrontendState>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        state.config_script.to_string(),
    )
}

/// Create the static asset router.
pub fn create_frontend_router(config: &Config) -> Router {
    let state = FrontendState {
        config_script: config_script(config.backend_base_url()).into(),
    };

    Router::new()
        .route("/config.js", get(config_js))
        .fallback_service(ServeDir::new(&config.static_dir).append_index_html_on_directories(true))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config() -> Config {
        Config {
            static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/frontend").to_string(),
            backend_url: "http://api.local:3001/".to_string(),
            ..Config::default()
        }
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        let response = create_frontend_router(&config())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[test]
    fn config_script_quotes_url() {
        assert_eq!(
            config_script("http://localhost:3001"),
            "window.BACKEND_URL = \"http://localhost:3001\";\n"
        );
    }

    #[tokio::test]
    async fn serves_index_on_root() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("sendDataBtn"));
    }

    #[tokio::test]
    async fn serves_script() {
        let (status, body) = get("/script.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/api/items"));
    }

    #[tokio::test]
    async fn config_js_points_at_backend() {
        let (status, body) = get("/config.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"http://api.local:3001\""));
    }

    #[tokio::test]
    async fn unknown_file_is_not_found() {
        let (status, _) = get("/missing.txt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
