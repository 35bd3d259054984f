//! Streaming chat completions
//!
//! The engine talks to an OpenAI-compatible endpoint through the
//! [`StreamTransport`] seam: `ReqwestTransport` in production, `MockTransport`
//! in tests. Raw lines are folded into a [`StreamCollector`] per round.

mod client;
mod collector;
mod error;
mod http;
pub mod mock;
mod request;
mod traits;

pub use client::CompletionClient;
pub use collector::{Finish, StreamCollector, TextDelta};
pub use error::{CompletionError, CompletionResult};
pub use http::ReqwestTransport;
pub use mock::{MockRound, MockTransport, RecordedRequest};
pub use request::{endpoint_url, request_body, request_headers};
pub use traits::StreamTransport;
