//! # Request Payloads
//!
//! JSON bodies published on the request topics. The operation itself is
//! carried by the topic and credentials travel as user properties, so none
//! of these payloads repeat either.

use serde::{Deserialize, Serialize};

/// Body of `StartSimulation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSimulationRequest {
    pub graph_id: String,
}

/// Body of `GetEnabledEvents`, `Terminate` and `GetLog`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRef {
    pub graph_id: String,
    pub sim_id: String,
}

impl SimulationRef {
    pub fn new(graph_id: impl Into<String>, sim_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            sim_id: sim_id.into(),
        }
    }
}

/// Body of `ExecuteEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteEventRequest {
    pub graph_id: String,
    pub sim_id: String,
    pub event_id: String,
    /// Data value for data events; absent for plain activities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Body of `ExecuteValueEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteValueEventRequest {
    pub graph_id: String,
    pub sim_id: String,
    pub event_id: String,
    pub value: String,
}
