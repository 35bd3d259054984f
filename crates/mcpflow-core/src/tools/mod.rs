//! Tool management module
//!
//! Tool discovery results, per-run bookkeeping and parallel execution.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  ToolCache                                  │
//! │    tool lists per server, TTL-bounded       │
//! └─────────────────────────────────────────────┘
//!           │ descriptors (+ per-tool toggles)
//!           ▼
//! ┌─────────────────────────────────────────────┐
//! │  ToolCatalog (one per run)                  │
//! │    enabled tools → backing client           │
//! └─────────────────────────────────────────────┘
//!           │ CallGates (disabled / consecutive / client)
//!           ▼
//! ┌─────────────────────────────────────────────┐
//! │  ConcurrentExecutor                         │
//! │    semaphore-bounded, tool_call retry       │
//! │    results sorted back into request order   │
//! └─────────────────────────────────────────────┘
//!           │ tools/call
//!           ▼
//!      ToolClient (pooled)
//! ```

mod cache;
mod catalog;
mod counters;
mod executor;

pub use cache::{ToolCache, DEFAULT_TOOL_CACHE_TTL};
pub use catalog::{CatalogEntry, ToolCatalog};
pub use counters::RunCounters;
pub use executor::{CallGates, ConcurrentExecutor, DEFAULT_MAX_CONCURRENCY};
