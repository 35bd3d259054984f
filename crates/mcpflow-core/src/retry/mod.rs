//! Retry policy for tool server operations
//!
//! Three named profiles cover the engine's needs: [`RetryPolicy::connection`]
//! for handshakes, [`RetryPolicy::tool_call`] for tool invocations and
//! [`RetryPolicy::general`] for everything else.

mod policy;

pub use policy::{RetryContext, RetryPolicy};
