//! # Reply Entities
//!
//! Results returned by the simulation backend and carried back in replies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reply body of `StartSimulation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartSimulationResponse {
    pub sim_id: String,
}

/// One event of a running simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcrEvent {
    pub event_id: String,
    pub label: String,
    /// Free-form description; may embed markup such as `<p>weight: 3</p>`.
    #[serde(default)]
    pub description: String,
    pub enabled: bool,
    pub pending: bool,
}

/// Reply body of `GetEnabledEvents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledEvents {
    pub events: Vec<DcrEvent>,
    /// Whether the simulation is currently in an accepting state.
    pub is_accepting: bool,
}

impl EnabledEvents {
    /// Find an event by its label.
    pub fn by_label(&self, label: &str) -> Option<&DcrEvent> {
        self.events.iter().find(|e| e.label == label)
    }

    /// Events that are both enabled and pending.
    pub fn pending(&self) -> impl Iterator<Item = &DcrEvent> {
        self.events.iter().filter(|e| e.enabled && e.pending)
    }
}

/// One entry of a simulation's execution log.
///
/// Also accepts the DCR API's `Id`/`Type`/`EventId` and camelCase spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(alias = "Id")]
    pub id: i64,
    #[serde(rename = "type", alias = "Type")]
    pub kind: String,
    #[serde(alias = "EventId", alias = "eventId")]
    pub event_id: String,
}

/// Reply body of `ExecuteValueEvent`: global store variable id to value.
pub type ExecutionResult = HashMap<String, String>;
