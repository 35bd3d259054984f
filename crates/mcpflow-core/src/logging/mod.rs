//! Logging abstractions for runtime-agnostic logging

mod traits;
mod console;
mod memory;
mod verbosity;

pub use traits::{LogLevel, Logger, LoggerExt, NoOpLogger, SharedLogger};
pub use console::ConsoleLogger;
pub use memory::RecordingLogger;
pub use verbosity::{LogVerbosity, VerbosityLogger};
