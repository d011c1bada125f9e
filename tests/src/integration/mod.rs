//! Cross-crate flows over the in-memory bus.

pub mod dispatch_flows;
pub mod scenario_flows;
