//! Ports (hexagonal boundaries) of the dispatcher.

pub mod outbound;

pub use outbound::{BackendError, SimulationBackend};
