//! Dispatcher and backend configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::{OperationRoutes, DEFAULT_TOPIC_PREFIX};
use std::time::Duration;

/// Default share group all dispatcher instances join.
pub const DEFAULT_SHARE_GROUP: &str = "dcrgroup";

/// Default DCR REST API location.
pub const DEFAULT_BASE_URL: &str = "https://repository.dcrgraphs.net/";

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Share group joined on every request topic
    pub share_group: String,
    /// Topic prefix shared with requesters (default: `DCR`)
    pub topic_prefix: String,
    /// Publish an error-shaped reply when the backend fails; when false the
    /// requester sees a timeout instead
    pub reply_on_backend_error: bool,
    /// Drop requests whose correlation data was already seen within this
    /// window on this instance. Disabled when absent.
    #[serde(default, with = "shared_types::humantime_serde::option")]
    pub dedup_window: Option<Duration>,
    /// Maximum requests handled concurrently
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            share_group: DEFAULT_SHARE_GROUP.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            reply_on_backend_error: true,
            dedup_window: None,
            max_in_flight: 64,
        }
    }
}

impl DispatcherConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.share_group.is_empty() || self.share_group.contains(['/', '+', '#']) {
            return Err(ConfigError::InvalidShareGroup(self.share_group.clone()));
        }

        OperationRoutes::new(&self.topic_prefix)
            .map_err(|e| ConfigError::InvalidPrefix(e.to_string()))?;

        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_in_flight cannot be 0".into(),
            ));
        }

        if matches!(self.dedup_window, Some(w) if w.is_zero()) {
            return Err(ConfigError::InvalidTimeout(
                "dedup_window cannot be 0; omit it to disable".into(),
            ));
        }

        Ok(())
    }

    /// Subscription filter for a request topic.
    pub fn shared_filter(&self, request_topic: &str) -> String {
        format!("$share/{}/{}", self.share_group, request_topic)
    }
}

/// DCR REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the DCR API
    pub base_url: String,
    /// Whole-request timeout
    #[serde(with = "shared_types::humantime_serde")]
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    #[serde(with = "shared_types::humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl BackendConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "backend timeouts cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Share group unusable in a `$share/<group>/` filter
    #[error("invalid share group: '{0}'")]
    InvalidShareGroup(String),
    /// Topic prefix rejected by the route table
    #[error("invalid topic prefix: {0}")]
    InvalidPrefix(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Base URL is not http(s)
    #[error("invalid backend base url: {0}")]
    InvalidBaseUrl(String),
}
