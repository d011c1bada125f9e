//! DCR-01 Requester - awaitable DCR simulation calls over publish/subscribe.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        REQUESTER (dcr-01)                          │
//! ├────────────────────────────────────────────────────────────────────┤
//! │  caller ──▶ DcrClient::start_simulation / get_log / ...            │
//! │                 │                                                  │
//! │                 ├─▶ PendingCallStore::register ──▶ (id, oneshot)   │
//! │                 ├─▶ publish <prefix>/<Op>  [id, reply topic, creds]│
//! │                 └─▶ await oneshot  ◀─┐   or timer ─▶ expire(id)    │
//! │                                      │                             │
//! │  ReplyListener ◀── <prefix>/<Op>/<client_id> (six subscriptions)   │
//! │        └─▶ PendingCallStore::complete(id, reply)                   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Removal from the pending table decides each call exactly once: a reply
//! that arrives after the timer fired finds nothing and is ignored.
//!
//! # Usage
//!
//! ```ignore
//! use dcr_01_requester::{DcrClient, RequesterConfig};
//!
//! let client = DcrClient::connect(bus, RequesterConfig::with_credentials(creds)).await?;
//! let sim_id = client.start_simulation("1822861").await?;
//! let events = client.get_enabled_events("1822861", &sim_id).await?;
//! ```

pub mod domain;
pub mod ipc;
pub mod service;

pub use domain::{
    generate_client_id, CallError, ConfigError, PendingCallStore, PendingSnapshot,
    RequesterConfig, RequesterError, DEFAULT_CALL_TIMEOUT,
};
pub use ipc::ReplyListener;
pub use service::DcrClient;
