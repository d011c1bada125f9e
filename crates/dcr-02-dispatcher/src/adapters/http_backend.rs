//! DCR REST API client implementing `SimulationBackend`.

use crate::adapters::events_xml::{global_store_xml, parse_events, parse_global_store};
use crate::domain::config::BackendConfig;
use crate::ports::{BackendError, SimulationBackend};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use shared_types::{Credentials, EnabledEvents, ExecutionResult, LogEntry};
use tracing::debug;

/// Header carrying the id of a newly started simulation.
pub const SIMULATION_ID_HEADER: &str = "simulationID";

/// Body of `GET /api/graphs/{g}/sims/{s}`.
#[derive(Debug, Deserialize)]
struct SimulationState {
    #[serde(rename = "DataXML", default)]
    data_xml: String,
}

/// HTTP client for the DCR graph simulation API.
///
/// Credentials are sent with HTTP basic authentication on every request.
pub struct DcrHttpBackend {
    client: Client,
    base_url: Url,
}

impl DcrHttpBackend {
    /// Create a new backend client.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::Http(format!("invalid base url {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Http(format!(
                "base url {} cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `<base>/api/graphs/...` from path segments; segments are
    /// percent-encoded, an empty last segment yields a trailing slash.
    fn url(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::Http("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn sim_url(&self, graph_id: &str, sim_id: &str, rest: &[&str]) -> Result<Url, BackendError> {
        let mut segments = vec!["api", "graphs", graph_id, "sims", sim_id];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    fn request(&self, method: Method, url: Url, credentials: &Credentials) -> RequestBuilder {
        debug!(method = %method, url = %url, "DCR request");
        self.client
            .request(method, url)
            .basic_auth(&credentials.username, Some(&credentials.password))
    }

    /// Send and turn any non-success status into `BackendError::Status`.
    async fn send(request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(http_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn body_text(response: Response) -> Result<String, BackendError> {
        response
            .text()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))
    }

    async fn post_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: Option<&str>,
        credentials: &Credentials,
    ) -> Result<(), BackendError> {
        let url = self.sim_url(graph_id, sim_id, &["events", event_id])?;
        let request = self.request(Method::POST, url, credentials);
        let request = match value {
            Some(value) => request
                .header(CONTENT_TYPE, "application/xml")
                .body(global_store_xml(event_id, value)),
            None => request.body(""),
        };
        Self::send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl SimulationBackend for DcrHttpBackend {
    async fn start_simulation(
        &self,
        graph_id: &str,
        credentials: &Credentials,
    ) -> Result<String, BackendError> {
        let url = self.url(&["api", "graphs", graph_id, "sims", ""])?;
        let response = Self::send(self.request(Method::POST, url, credentials).body("")).await?;

        response
            .headers()
            .get(SIMULATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(BackendError::MissingSimulationId)
    }

    async fn get_enabled_events(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<EnabledEvents, BackendError> {
        let mut url = self.sim_url(graph_id, sim_id, &["events"])?;
        url.query_pairs_mut().append_pair("filter", "only-enabled");
        let response = Self::send(self.request(Method::GET, url, credentials)).await?;
        let text = Self::body_text(response).await?;

        // The document normally arrives as a JSON string; accept bare XML too.
        let xml = if text.trim_start().starts_with('<') {
            text
        } else {
            serde_json::from_str::<String>(&text)
                .map_err(|e| BackendError::Parse(format!("events body: {}", e)))?
        };
        parse_events(&xml)
    }

    async fn execute_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: Option<&str>,
        credentials: &Credentials,
    ) -> Result<(), BackendError> {
        self.post_event(graph_id, sim_id, event_id, value, credentials)
            .await
    }

    async fn execute_value_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: &str,
        credentials: &Credentials,
    ) -> Result<ExecutionResult, BackendError> {
        self.post_event(graph_id, sim_id, event_id, Some(value), credentials)
            .await?;

        let url = self.sim_url(graph_id, sim_id, &[])?;
        let response = Self::send(self.request(Method::GET, url, credentials)).await?;
        let text = Self::body_text(response).await?;
        let state: SimulationState = serde_json::from_str(&text)
            .map_err(|e| BackendError::Parse(format!("simulation body: {}", e)))?;
        parse_global_store(&state.data_xml)
    }

    async fn terminate(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<(), BackendError> {
        let url = self.sim_url(graph_id, sim_id, &[])?;
        Self::send(self.request(Method::DELETE, url, credentials)).await?;
        Ok(())
    }

    async fn get_log(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<LogEntry>, BackendError> {
        let url = self.sim_url(graph_id, sim_id, &["log"])?;
        let response = Self::send(self.request(Method::GET, url, credentials)).await?;
        let text = Self::body_text(response).await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Parse(format!("log body: {}", e)))
    }
}

fn http_error(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Http(format!("timed out: {}", e))
    } else if e.is_connect() {
        BackendError::Http(format!("connection failed: {}", e))
    } else {
        BackendError::Http(e.to_string())
    }
}
