//! Tool orchestration
//!
//! - `Orchestrator`: the multi-round loop for one conversation
//! - `ToolService`: startup-built owner of pool, cache, run gate and settings
//! - `RunObserver`: progress callbacks; `ToolTraceDisplay` renders them
//! - `ToolStrategy` / `StrategyConfig`: how hard the model is pushed toward
//!   tools and the limits a run honours
//!
//! ```rust,ignore
//! use mcpflow_core::orchestrator::{ToolService, ToolTraceDisplay};
//!
//! let service = ToolService::start(store, factory, transport, logger).await?;
//! let mut display = ToolTraceDisplay::new(ResultDisplayMode::Mixed, true);
//! match service.complete(&conversation, Some("research"), &mut display, &cancel).await {
//!     Ok(_) => show(display.render()),
//!     Err(e) => show(e.user_message()),
//! }
//! ```

mod display;
mod engine;
mod error;
mod observer;
mod prompt;
mod service;
mod strategy;

pub use display::ToolTraceDisplay;
pub use engine::{budget_warning, Orchestrator, RunOutcome};
pub use error::{OrchestratorError, OrchestratorResult};
pub use observer::{NoOpObserver, RunObserver};
pub use prompt::{build_system_prompt, describe_tool, describe_tools, signals_no_suitable_tool, strip_think};
pub use service::{ServiceStatistics, SettingsStrategyResolver, StrategyResolver, ToolService};
pub use strategy::{
    DescriptionTier, ResultDisplayMode, StrategyConfig, ToolStrategy, DEFAULT_CONSECUTIVE_LIMIT,
    DEFAULT_TOTAL_LIMIT, NO_SUITABLE_TOOL_MARKER,
};
