//! Bus-facing side of the dispatcher.

pub mod handler;

pub use handler::{DecodedRequest, DispatchSnapshot, DispatchStats, Handled, RequestHandler};
