//! Settings and where they are stored
//!
//! - `Settings`: the whole document (completion endpoint, tool servers,
//!   prompt → strategy bindings, per-strategy limits and display)
//! - `MemorySettingsStore`: In-memory for testing
//! - `FileSettingsStore`: YAML file (user level or explicit path)

mod file;
mod memory;
mod settings;
mod traits;

pub use file::FileSettingsStore;
pub use memory::MemorySettingsStore;
pub use settings::{CompletionSettings, McpSettings, Settings, DEFAULT_COMPLETION_URL, DEFAULT_MODEL};
pub use traits::{ConfigError, ConfigResult, SettingsStore};
