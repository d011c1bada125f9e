//! Bus side of the requester.

pub mod reply_listener;

pub use reply_listener::ReplyListener;
