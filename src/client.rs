//! HTTP client for the items API.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::api::{CreateItemResponse, ListItemsResponse};
use crate::error::{AppError, Result};
use crate::item::Item;

/// Items API client.
#[derive(Debug, Clone)]
pub struct ItemsClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL of the API, without trailing slash.
    base_url: String,
}

impl ItemsClient {
    /// Create a client for the API at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn items_url(&self) -> String {
        format!("{}/api/items", self.base_url)
    }

    /// `POST /api/items`.
    #[instrument(skip(self, item), fields(id = %item.id()))]
    pub async fn create_item(&self, item: &Item) -> Result<CreateItemResponse> {
        let response = self.http.post(self.items_url()).json(item).send().await?;
        read_json(response).await
    }

    /// `GET /api/items`.
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> Result<ListItemsResponse> {
        let response = self.http.get(self.items_url()).send().await?;
        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "API response");

    if !status.is_success() {
        return Err(AppError::Api {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = ItemsClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
        assert_eq!(client.items_url(), "http://localhost:3001/api/items");
    }
}
