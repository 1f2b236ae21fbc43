//! Request failures and their JSON responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::error::{ItemError, StoreError};
use crate::metrics;

/// Error body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// What failed.
    pub error: String,
    /// Why it failed.
    pub details: String,
}

/// Store step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    /// The table guard could not provision or verify the table.
    Table,
    /// The put request failed.
    Write,
    /// The scan request failed.
    Read,
}

impl Dependency {
    fn summary(self) -> &'static str {
        match self {
            Dependency::Table => "Failed to ensure DynamoDB table exists.",
            Dependency::Write => "Failed to send data to DynamoDB",
            Dependency::Read => "Failed to read data from DynamoDB",
        }
    }
}

/// Failure of an API request.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request body is not a storable item. Surfaced as 400.
    #[error("validation error: {0}")]
    Validation(#[from] ItemError),

    /// The store failed. Surfaced as 500 with the store's message.
    #[error("dependency error: {source}")]
    Dependency {
        /// Step that failed.
        step: Dependency,
        /// Underlying store error.
        source: StoreError,
    },
}

impl ApiError {
    /// Wrap a store error raised at `step`.
    pub fn dependency(step: Dependency) -> impl FnOnce(StoreError) -> Self {
        move |source| ApiError::Dependency { step, source }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Dependency { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(ItemError::Malformed(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(reason) => {
                metrics::inc_validation_failures();
                warn!(reason = %reason, "Rejected item");
                let error = match reason {
                    ItemError::Malformed(_) | ItemError::NotAnObject => {
                        "Request body must be a JSON object."
                    }
                    ItemError::MissingId => {
                        "Missing 'id' in the request body. DynamoDB requires a primary key."
                    }
                    ItemError::InvalidId | ItemError::EmptyId => {
                        "'id' must be a non-empty string. DynamoDB requires a primary key."
                    }
                }
                .to_string();
                ErrorBody {
                    error,
                    details: reason.to_string(),
                }
            }
            ApiError::Dependency { step, source } => {
                metrics::inc_dependency_failures();
                error!(
                    code = source.code(),
                    message = %source,
                    "{}",
                    step.summary()
                );
                ErrorBody {
                    error: step.summary().to_string(),
                    details: source.to_string(),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
