//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

use crate::guard::WaitPolicy;
use crate::store::TableDefinition;

/// Table name used when `TABLE_NAME` is not set.
pub const DEFAULT_TABLE_NAME: &str = "dynamo-test";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Servers ===
    /// Port the items API listens on.
    #[serde(default = "default_backend_port")]
    pub backend_port: u16,

    /// Port the static frontend listens on.
    #[serde(default = "default_frontend_port")]
    pub frontend_port: u16,

    /// The single origin allowed by CORS on the API.
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,

    /// Public URL of the API, handed to the browser script and the CLI client.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Directory holding the frontend bundle.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    // === Table ===
    /// Backing table name.
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Provisioned read capacity used when the table is created.
    #[serde(default = "default_capacity")]
    pub table_read_capacity: i64,

    /// Provisioned write capacity used when the table is created.
    #[serde(default = "default_capacity")]
    pub table_write_capacity: i64,

    /// Maximum seconds to wait for a new table to become active.
    #[serde(default = "default_table_wait_secs")]
    pub table_wait_secs: u64,

    /// Seconds between describe calls while waiting.
    #[serde(default = "default_table_poll_secs")]
    pub table_poll_secs: u64,

    // === AWS ===
    /// Region override; the SDK default chain is used when unset.
    #[serde(default)]
    pub aws_region: Option<String>,

    /// Custom endpoint, e.g. DynamoDB Local.
    #[serde(default)]
    pub aws_endpoint_url: Option<String>,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Emit JSON log lines.
    #[serde(default)]
    pub log_json: bool,
}

fn default_backend_port() -> u16 {
    3001
}

fn default_frontend_port() -> u16 {
    3000
}

fn default_frontend_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_static_dir() -> String {
    "frontend".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_capacity() -> i64 {
    5
}

fn default_table_wait_secs() -> u64 {
    180
}

fn default_table_poll_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_port: default_backend_port(),
            frontend_port: default_frontend_port(),
            frontend_origin: default_frontend_origin(),
            backend_url: default_backend_url(),
            static_dir: default_static_dir(),
            table_name: default_table_name(),
            table_read_capacity: default_capacity(),
            table_write_capacity: default_capacity(),
            table_wait_secs: default_table_wait_secs(),
            table_poll_secs: default_table_poll_secs(),
            aws_region: None,
            aws_endpoint_url: None,
            rust_log: default_log_level(),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.table_name.len() < 3 || self.table_name.len() > 255 {
            return Err("TABLE_NAME must be between 3 and 255 characters".to_string());
        }

        if !self
            .table_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err("TABLE_NAME may only contain a-z, A-Z, 0-9, '_', '-' and '.'".to_string());
        }

        if self.table_read_capacity < 1 || self.table_write_capacity < 1 {
            return Err("TABLE_READ_CAPACITY and TABLE_WRITE_CAPACITY must be at least 1".to_string());
        }

        if self.table_poll_secs == 0 {
            return Err("TABLE_POLL_SECS must be greater than zero".to_string());
        }

        if self.table_wait_secs < self.table_poll_secs {
            return Err("TABLE_WAIT_SECS must not be shorter than TABLE_POLL_SECS".to_string());
        }

        validate_origin("FRONTEND_ORIGIN", &self.frontend_origin)?;
        validate_http_url("BACKEND_URL", &self.backend_url)?;
        if let Some(endpoint) = &self.aws_endpoint_url {
            validate_http_url("AWS_ENDPOINT_URL", endpoint)?;
        }

        Ok(())
    }

    /// Definition of the backing table.
    pub fn table_definition(&self) -> TableDefinition {
        TableDefinition {
            name: self.table_name.clone(),
            read_capacity: self.table_read_capacity,
            write_capacity: self.table_write_capacity,
        }
    }

    /// How long to wait for a newly created table.
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_secs(self.table_poll_secs),
            max_wait: Duration::from_secs(self.table_wait_secs),
        }
    }

    /// Backend URL without a trailing slash.
    pub fn backend_base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", name, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{} must use http or https", name));
    }
    Ok(parsed)
}

/// The value must be exactly what a browser sends in its `Origin` header.
fn validate_origin(name: &str, value: &str) -> Result<(), String> {
    let origin = validate_http_url(name, value)?.origin().ascii_serialization();
    if origin != value {
        return Err(format!("{} must be a bare origin such as {}", name, origin));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_demo_setup() {
        let config = Config::default();
        assert_eq!(config.backend_port, 3001);
        assert_eq!(config.frontend_port, 3000);
        assert_eq!(config.frontend_origin, "http://localhost:3000");
        assert_eq!(config.table_name, DEFAULT_TABLE_NAME);
        assert_eq!(config.table_wait_secs, 180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_short_table_name() {
        let config = Config {
            table_name: "ab".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_table_characters() {
        let config = Config {
            table_name: "items table".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_origin() {
        let config = Config {
            frontend_origin: "ftp://localhost".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            frontend_origin: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_origin_with_path() {
        for origin in ["http://localhost:3000/", "http://localhost:3000/app", "http://localhost:80"] {
            let config = Config {
                frontend_origin: origin.to_string(),
                ..Config::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.contains("bare origin"), "{}: {}", origin, err);
        }

        let config = Config {
            frontend_origin: "https://items.example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_wait_shorter_than_poll() {
        let config = Config {
            table_wait_secs: 2,
            table_poll_secs: 5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn wait_policy_uses_configured_seconds() {
        let config = Config {
            table_wait_secs: 60,
            table_poll_secs: 2,
            ..Config::default()
        };
        let policy = config.wait_policy();
        assert_eq!(policy.max_wait, Duration::from_secs(60));
        assert_eq!(policy.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn backend_base_url_strips_trailing_slash() {
        let config = Config {
            backend_url: "http://localhost:3001/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.backend_base_url(), "http://localhost:3001");
    }
}
