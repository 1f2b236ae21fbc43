//! Items API backed by a lazily provisioned DynamoDB table.
//!
//! The API proxies two operations to a single key-value table:
//!
//! ```text
//! POST /api/items   upsert a JSON object keyed by its string `id`
//! GET  /api/items   full-table scan, every item plus a count
//! ```
//!
//! Before the first read or write the table guard checks that the table
//! exists, creates it with a string hash key `id` if it does not, and waits
//! for it to become ACTIVE. Once that has succeeded the check is skipped for
//! the life of the process.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`item`]: The stored record
//! - [`store`]: Store trait, DynamoDB client and in-memory store
//! - [`guard`]: One-time table provisioning
//! - [`api`]: HTTP API, CORS and OpenAPI document
//! - [`frontend`]: Static asset server for the browser demo
//! - [`client`]: HTTP client for the API
//! - [`seed`]: Sample item generation
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod frontend;
pub mod guard;
pub mod item;
pub mod metrics;
pub mod seed;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use item::Item;
