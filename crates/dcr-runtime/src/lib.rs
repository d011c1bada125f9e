//! # DCR Bridge Runtime
//!
//! Wires the bridge together inside one process:
//!
//! ```text
//!   scenario clients (dcr-01)          dispatchers (dcr-02)
//!   ┌────────────┐  <prefix>/<Op>      ┌──────────────┐     HTTPS
//!   │ DcrClient  │ ──────────────────▶ │ Dispatcher 1 │ ──────────▶ DCR API
//!   │ DcrClient  │   InMemoryMessage   │ Dispatcher 2 │
//!   │ DcrClient  │ ◀────────────────── │     ...      │
//!   └────────────┘ <prefix>/<Op>/<id>  └──────────────┘
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `DCR_*` environment, then CLI flags)
//! 2. Install the tracing subscriber
//! 3. Create the bus and start the dispatcher pool
//! 4. Run the lazy-user scenario, one requester per client
//! 5. Shut down on completion or Ctrl-C

pub mod config;
pub mod logging;
pub mod runtime;
pub mod scenario;

pub use config::{AppConfig, AppConfigError, BrokerConfig, ScenarioConfig};
pub use runtime::DcrRuntime;
pub use scenario::{LazyUserScenario, ScenarioError, ScenarioOutcome, Verdict};
