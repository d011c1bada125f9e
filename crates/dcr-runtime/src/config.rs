//! # Runtime Configuration
//!
//! One JSON document with a section per component, overridable from the
//! environment.
//!
//! ```json
//! {
//!   "broker":     { "channel_capacity": 1000 },
//!   "requester":  { "call_timeout": "30s", "credentials": { "username": "..", "password": ".." } },
//!   "dispatcher": { "share_group": "dcrgroup", "reply_on_backend_error": true },
//!   "backend":    { "base_url": "https://repository.dcrgraphs.net/" },
//!   "scenario":   { "detector_graph": "1822861", "customer_graph": "1822880" }
//! }
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `DCR_USERNAME` / `DCR_PASSWORD` | requester credentials |
//! | `DCR_TOPIC_PREFIX` | topic prefix for requesters and dispatchers |
//! | `DCR_CALL_TIMEOUT` | requester call timeout (`"30s"`, `"500ms"`) |
//! | `DCR_SHARE_GROUP` | dispatcher share group |
//! | `DCR_BASE_URL` | DCR API base URL |
//! | `DCR_CLIENTS` / `DCR_WORKERS` | scenario clients / dispatcher instances |

use dcr_01_requester::RequesterConfig;
use dcr_02_dispatcher::{BackendConfig, DispatcherConfig};
use serde::{Deserialize, Serialize};
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use shared_types::humantime_serde::parse_duration;
use std::path::Path;
use thiserror::Error;

/// Default detector graph ("BSc Albert Detector").
pub const DEFAULT_DETECTOR_GRAPH: &str = "1822861";

/// Default customer graph ("BSc Albert Sus Customer").
pub const DEFAULT_CUSTOMER_GRAPH: &str = "1822880";

/// Customer graph that should never trigger the detector.
pub const GOOD_CUSTOMER_GRAPH: &str = "1822881";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub broker: BrokerConfig,
    pub requester: RequesterConfig,
    pub dispatcher: DispatcherConfig,
    pub backend: BackendConfig,
    pub scenario: ScenarioConfig,
}

/// In-process message bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Per-subscriber queue capacity
    pub channel_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Lazy-user scenario settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub detector_graph: String,
    pub customer_graph: String,
    /// Concurrent scenario clients, each with its own requester
    pub clients: usize,
    /// Dispatcher instances sharing the request topics
    pub workers: usize,
    /// Customer events executed per client before giving up
    pub rounds: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            detector_graph: DEFAULT_DETECTOR_GRAPH.to_string(),
            customer_graph: DEFAULT_CUSTOMER_GRAPH.to_string(),
            clients: 3,
            workers: 2,
            rounds: 5,
        }
    }
}

/// Runtime configuration errors.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("requester: {0}")]
    Requester(#[from] dcr_01_requester::ConfigError),

    #[error("dispatcher: {0}")]
    Dispatcher(#[from] dcr_02_dispatcher::ConfigError),

    #[error("{0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load from an optional JSON file, then apply `DCR_*` environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AppConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AppConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AppConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("DCR_USERNAME") {
            self.requester.credentials.username = username;
        }
        if let Some(password) = lookup("DCR_PASSWORD") {
            self.requester.credentials.password = password;
        }
        if let Some(prefix) = lookup("DCR_TOPIC_PREFIX") {
            self.requester.topic_prefix = prefix.clone();
            self.dispatcher.topic_prefix = prefix;
        }
        if let Some(timeout) = lookup("DCR_CALL_TIMEOUT") {
            self.requester.call_timeout =
                parse_duration(&timeout).map_err(|reason| AppConfigError::Env {
                    var: "DCR_CALL_TIMEOUT",
                    reason: reason.to_string(),
                })?;
        }
        if let Some(group) = lookup("DCR_SHARE_GROUP") {
            self.dispatcher.share_group = group;
        }
        if let Some(url) = lookup("DCR_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(clients) = lookup("DCR_CLIENTS") {
            self.scenario.clients = parse_count("DCR_CLIENTS", &clients)?;
        }
        if let Some(workers) = lookup("DCR_WORKERS") {
            self.scenario.workers = parse_count("DCR_WORKERS", &workers)?;
        }
        Ok(())
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), AppConfigError> {
        self.requester.validate()?;
        self.dispatcher.validate()?;
        self.backend.validate()?;

        if self.requester.topic_prefix.trim_end_matches('/')
            != self.dispatcher.topic_prefix.trim_end_matches('/')
        {
            return Err(AppConfigError::Invalid(format!(
                "requester prefix '{}' does not match dispatcher prefix '{}'",
                self.requester.topic_prefix, self.dispatcher.topic_prefix
            )));
        }
        if self.broker.channel_capacity == 0 {
            return Err(AppConfigError::Invalid(
                "broker.channel_capacity cannot be 0".into(),
            ));
        }
        if self.scenario.workers == 0 {
            return Err(AppConfigError::Invalid("scenario.workers cannot be 0".into()));
        }
        if self.scenario.detector_graph.is_empty() || self.scenario.customer_graph.is_empty() {
            return Err(AppConfigError::Invalid("graph ids cannot be empty".into()));
        }
        Ok(())
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, AppConfigError> {
    value.trim().parse().map_err(|_| AppConfigError::Env {
        var,
        reason: format!("expected a number, got '{value}'"),
    })
}
