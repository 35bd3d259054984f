//! Core types shared by the wire client, executor and orchestrator

mod message;
mod limit;
mod server;
mod tool;
mod stream;
mod cancellation;

pub use message::{ConversationMessage, MessageRole};
pub use limit::CallLimit;
pub use server::{ServerDescriptor, ToolToggle};
pub use tool::{FunctionCall, PendingToolCall, ToolCallRequest, ToolCallResult, ToolDescriptor};
pub use stream::{ChunkChoice, ChunkDelta, CompletionChunk, FunctionDelta, ToolCallDelta};
pub use cancellation::CancellationToken;
