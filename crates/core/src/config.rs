use serde::{Deserialize, Serialize};
use std::time::Duration;

/// # Summary
/// Connection and lifecycle settings of one session.
///
/// # Invariants
/// - Durations are expressed in milliseconds so the struct loads from flat config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    // unsubscribe once a backtest reports progress 1
    pub close_after_completed: bool,
    pub poll_timeout_ms: u64,
    pub teardown_timeout_ms: u64,
    pub catch_up_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 33333,
            username: None,
            password: None,
            database: None,
            collection: None,
            close_after_completed: false,
            poll_timeout_ms: 500,
            teardown_timeout_ms: 2000,
            catch_up_limit: 100,
        }
    }
}

impl SessionConfig {
    /// Session name, `"{host}:{port}"`.
    pub fn name(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn teardown_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_timeout_ms)
    }

    /// # Summary
    /// Rejects settings no transport can work with.
    ///
    /// # Returns
    /// A description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.port == 0 {
            return Err("port must not be 0".to_string());
        }
        if self.poll_timeout_ms == 0 {
            return Err("poll_timeout_ms must be positive".to_string());
        }
        Ok(())
    }
}

/// Which adapter feeds the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Socket,
    Journal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: String,
    pub poll_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            poll_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub path: String,
    pub connect_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            connect_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: String,
    // EnvFilter directive used when RUST_LOG is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            filter: "info".to_string(),
        }
    }
}

/// Global application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportKind,
    pub session: SessionConfig,
    pub store: StoreConfig,
    pub feed: FeedConfig,
    pub log: LogConfig,
}
