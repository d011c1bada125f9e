//! # Operations and Topics
//!
//! The fixed set of remote procedures and the topic layout that carries them.
//!
//! ```text
//! request:  <prefix>/<Operation>              e.g. DCR/StartSimulation
//! reply:    <prefix>/<Operation>/<client_id>  e.g. DCR/StartSimulation/client-7
//! ```

use crate::errors::RouteError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default topic prefix shared by requesters and dispatchers.
pub const DEFAULT_TOPIC_PREFIX: &str = "DCR";

/// A logical remote procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Start a new simulation of a graph.
    StartSimulation,
    /// List the enabled events of a simulation.
    GetEnabledEvents,
    /// Execute an event, optionally carrying a value.
    ExecuteEvent,
    /// Execute an event with a value and return the resulting global store.
    ExecuteValueEvent,
    /// Delete a simulation.
    Terminate,
    /// Fetch the execution log of a simulation.
    GetLog,
}

impl Operation {
    /// Every operation, in wire order.
    pub const ALL: [Operation; 6] = [
        Operation::StartSimulation,
        Operation::GetEnabledEvents,
        Operation::ExecuteEvent,
        Operation::ExecuteValueEvent,
        Operation::Terminate,
        Operation::GetLog,
    ];

    /// Name used as the operation segment of a topic.
    pub fn wire_name(self) -> &'static str {
        match self {
            Operation::StartSimulation => "StartSimulation",
            Operation::GetEnabledEvents => "GetEnabledEvents",
            Operation::ExecuteEvent => "ExecuteEvent",
            Operation::ExecuteValueEvent => "ExecuteValueEvent",
            Operation::Terminate => "Terminate",
            Operation::GetLog => "GetLog",
        }
    }

    /// Topic a requester publishes this operation to.
    pub fn request_topic(self, prefix: &str) -> String {
        format!("{}/{}", prefix, self.wire_name())
    }

    /// Topic on which `client_id` expects replies for this operation.
    pub fn reply_topic(self, prefix: &str, client_id: &str) -> String {
        format!("{}/{}/{}", prefix, self.wire_name(), client_id)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Operation {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.wire_name() == s)
            .ok_or_else(|| RouteError::UnknownOperation(s.to_string()))
    }
}

/// Mapping from request topic to operation, built once at startup.
///
/// Construction checks the table against the fixed operation set, so a
/// message on a topic outside the table is simply not one of ours.
#[derive(Debug, Clone)]
pub struct OperationRoutes {
    prefix: String,
    by_topic: HashMap<String, Operation>,
}

impl OperationRoutes {
    /// Build the request-topic table for `prefix`.
    pub fn new(prefix: &str) -> Result<Self, RouteError> {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return Err(RouteError::EmptyPrefix);
        }
        if prefix.contains(['+', '#']) || prefix.starts_with('$') {
            return Err(RouteError::InvalidPrefix(prefix.to_string()));
        }

        let mut by_topic = HashMap::with_capacity(Operation::ALL.len());
        for op in Operation::ALL {
            let topic = op.request_topic(prefix);
            if let Some(existing) = by_topic.insert(topic.clone(), op) {
                return Err(RouteError::DuplicateTopic {
                    topic,
                    first: existing,
                    second: op,
                });
            }
        }

        Ok(Self {
            prefix: prefix.to_string(),
            by_topic,
        })
    }

    /// Topic prefix this table was built for.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolve the operation for an inbound request topic.
    pub fn resolve(&self, topic: &str) -> Option<Operation> {
        self.by_topic.get(topic).copied()
    }

    /// All request topics, in operation order.
    pub fn request_topics(&self) -> Vec<String> {
        Operation::ALL
            .into_iter()
            .map(|op| op.request_topic(&self.prefix))
            .collect()
    }
}
