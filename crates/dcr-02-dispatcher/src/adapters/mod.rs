//! Adapters connecting the dispatcher's ports to the outside world.

pub mod events_xml;
pub mod http_backend;

pub use http_backend::{DcrHttpBackend, SIMULATION_ID_HEADER};
