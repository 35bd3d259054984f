//! Log level filtering driven by the host's verbosity setting

use serde::{Deserialize, Serialize};

use super::traits::{LogLevel, Logger, SharedLogger};

/// The host's three-step log verbosity (0, 1, 2 in settings)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum LogVerbosity {
    /// Warnings and errors only
    #[default]
    Coarse,
    /// Adds lifecycle and per-round information
    Medium,
    /// Adds per-request and per-chunk detail
    Verbose,
}

impl From<u8> for LogVerbosity {
    fn from(level: u8) -> Self {
        match level {
            0 => LogVerbosity::Coarse,
            1 => LogVerbosity::Medium,
            _ => LogVerbosity::Verbose,
        }
    }
}

impl From<LogVerbosity> for u8 {
    fn from(verbosity: LogVerbosity) -> Self {
        match verbosity {
            LogVerbosity::Coarse => 0,
            LogVerbosity::Medium => 1,
            LogVerbosity::Verbose => 2,
        }
    }
}

impl LogVerbosity {
    /// Lowest level that passes at this verbosity
    pub fn threshold(&self) -> LogLevel {
        match self {
            LogVerbosity::Coarse => LogLevel::Warn,
            LogVerbosity::Medium => LogLevel::Info,
            LogVerbosity::Verbose => LogLevel::Debug,
        }
    }

    pub fn allows(&self, level: LogLevel) -> bool {
        level >= self.threshold()
    }
}

/// Wraps a logger and drops messages the configured verbosity hides
pub struct VerbosityLogger {
    inner: SharedLogger,
    verbosity: LogVerbosity,
}

impl VerbosityLogger {
    pub fn new(inner: SharedLogger, verbosity: LogVerbosity) -> Self {
        Self { inner, verbosity }
    }

    pub fn verbosity(&self) -> LogVerbosity {
        self.verbosity
    }
}

impl Logger for VerbosityLogger {
    fn debug(&self, message: &str) {
        if self.verbosity.allows(LogLevel::Debug) {
            self.inner.debug(message);
        }
    }

    fn info(&self, message: &str) {
        if self.verbosity.allows(LogLevel::Info) {
            self.inner.info(message);
        }
    }

    fn warn(&self, message: &str) {
        if self.verbosity.allows(LogLevel::Warn) {
            self.inner.warn(message);
        }
    }

    fn error(&self, message: &str) {
        self.inner.error(message);
    }
}
