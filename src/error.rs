//! Unified error types for the items service.

use thiserror::Error;

use crate::store::TableStatus;

/// Unified error type for the items service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backing store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The configured CORS origin cannot be used as a header value.
    #[error("invalid CORS origin {origin}")]
    InvalidOrigin {
        /// The rejected origin.
        origin: String,
    },

    /// Prometheus recorder could not be installed.
    #[error("metrics error: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The items API answered with a non-success status.
    #[error("api returned {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the backing key-value store and the table guard.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// A create request raced with another one.
    #[error("table {table} already exists")]
    TableAlreadyExists {
        /// Table name.
        table: String,
    },

    /// The table does not exist (or is not active yet).
    #[error("table {table} not found")]
    TableNotFound {
        /// Table name.
        table: String,
    },

    /// The table exists but is in a state that cannot serve requests.
    #[error("table {table} is {status}")]
    TableUnavailable {
        /// Table name.
        table: String,
        /// Status reported by the store.
        status: TableStatus,
    },

    /// The table did not become active in time.
    #[error("table {table} did not become ACTIVE within {waited_secs}s")]
    ProvisionTimeout {
        /// Table name.
        table: String,
        /// Seconds waited.
        waited_secs: u64,
    },

    /// An item could not be converted to or from store attributes.
    #[error("item conversion failed: {0}")]
    Conversion(String),

    /// The store rejected a request.
    #[error("{operation} failed: {message}")]
    Service {
        /// Store operation, e.g. `PutItem`.
        operation: &'static str,
        /// Error code reported by the store.
        code: Option<String>,
        /// Error message reported by the store.
        message: String,
    },
}

impl StoreError {
    /// Error code for logs, following the store's naming where one exists.
    pub fn code(&self) -> &str {
        match self {
            StoreError::TableAlreadyExists { .. } => "ResourceInUseException",
            StoreError::TableNotFound { .. } => "ResourceNotFoundException",
            StoreError::TableUnavailable { .. } => "TableNotActive",
            StoreError::ProvisionTimeout { .. } => "WaiterTimeout",
            StoreError::Conversion(_) => "SerializationException",
            StoreError::Service { code, .. } => code.as_deref().unwrap_or("Unknown"),
        }
    }
}

/// Reasons a request body is not a storable item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    /// Body is valid JSON but not an object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// Body has no `id` field.
    #[error("missing 'id' in the request body")]
    MissingId,

    /// `id` is present but not a string.
    #[error("'id' must be a string")]
    InvalidId,

    /// `id` is an empty string.
    #[error("'id' must not be empty")]
    EmptyId,

    /// Body could not be parsed.
    #[error("malformed request body: {0}")]
    Malformed(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
