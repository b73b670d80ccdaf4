//! Server configuration types for Cardroom.
//!
//! `ServerConfig` represents `config.toml` in the data directory. Every
//! field has a default, so an empty or missing file is valid.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the relay supervisor does when a change notification fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure and keep the current subscription.
    #[default]
    LogAndContinue,
    /// Log the failure, drop the subscription and take a fresh one.
    RestartSubscription,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::LogAndContinue => write!(f, "log_and_continue"),
            FailurePolicy::RestartSubscription => write!(f, "restart_subscription"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "log_and_continue" => Ok(FailurePolicy::LogAndContinue),
            "restart_subscription" => Ok(FailurePolicy::RestartSubscription),
            other => Err(format!("invalid failure policy: '{other}'")),
        }
    }
}

/// Top-level configuration for the lobby server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound queue length per websocket connection.
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,

    /// Capacity of the in-process change feed.
    #[serde(default = "default_change_feed_capacity")]
    pub change_feed_capacity: usize,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Delay before resubscribing under `RestartSubscription`.
    #[serde(default = "default_restart_backoff_ms")]
    pub restart_backoff_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_connection_buffer() -> usize {
    64
}

fn default_change_feed_capacity() -> usize {
    1024
}

fn default_restart_backoff_ms() -> u64 {
    500
}

impl ServerConfig {
    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connection_buffer: default_connection_buffer(),
            change_feed_capacity: default_change_feed_capacity(),
            failure_policy: FailurePolicy::default(),
            restart_backoff_ms: default_restart_backoff_ms(),
        }
    }
}
