//! DCR-02 Dispatcher - serves DCR simulation requests from the message bus.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       DISPATCHER (dcr-02)                          │
//! ├────────────────────────────────────────────────────────────────────┤
//! │  $share/<group>/<prefix>/<Op>  (six shared subscriptions)          │
//! │        │                                                           │
//! │        ▼                                                           │
//! │  dispatch loop ──▶ one task per request (bounded by max_in_flight) │
//! │        │                                                           │
//! │        ▼                                                           │
//! │  RequestHandler: route ─▶ decode ─▶ credentials ─▶ backend         │
//! │        │                                              │            │
//! │        │                         SimulationBackend ◀──┘            │
//! │        │                          └─ DcrHttpBackend (REST + XML)   │
//! │        ▼                                                           │
//! │  publish reply on the request's response topic,                    │
//! │  correlation data copied verbatim                                  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Instances are stateless between requests; any number can join the same
//! share group.

pub mod adapters;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::{DcrHttpBackend, SIMULATION_ID_HEADER};
pub use domain::{
    BackendConfig, ConfigError, DispatchError, DispatcherConfig, DispatcherError,
    RecentRequestFilter, DEFAULT_BASE_URL, DEFAULT_SHARE_GROUP,
};
pub use ipc::{DecodedRequest, DispatchSnapshot, Handled, RequestHandler};
pub use ports::{BackendError, SimulationBackend};
pub use service::DispatcherService;
