//! Requester configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::{Credentials, OperationRoutes, DEFAULT_TOPIC_PREFIX};
use std::time::Duration;

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Requester configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequesterConfig {
    /// Identifier appended to reply topics. Must be unique per live client.
    pub client_id: String,
    /// Topic prefix shared with the dispatchers (default: `DCR`)
    pub topic_prefix: String,
    /// Time a call waits for its reply
    #[serde(with = "shared_types::humantime_serde")]
    pub call_timeout: Duration,
    /// Backend credentials attached to every request
    pub credentials: Credentials,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            client_id: generate_client_id(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            credentials: Credentials::default(),
        }
    }
}

impl RequesterConfig {
    /// Configuration with the given credentials and otherwise default values.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidClientId("client_id cannot be empty".into()));
        }
        if self.client_id.contains(['/', '+', '#']) {
            return Err(ConfigError::InvalidClientId(format!(
                "client_id '{}' must be a single topic level",
                self.client_id
            )));
        }

        OperationRoutes::new(&self.topic_prefix)
            .map_err(|e| ConfigError::InvalidPrefix(e.to_string()))?;

        if self.call_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "call_timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }
}

/// Generate a client id of the form `dcr-client-<8 hex>`.
pub fn generate_client_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("dcr-client-{}", &id[..8])
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Client id unusable as a topic level
    #[error("invalid client id: {0}")]
    InvalidClientId(String),
    /// Topic prefix rejected by the route table
    #[error("invalid topic prefix: {0}")]
    InvalidPrefix(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
