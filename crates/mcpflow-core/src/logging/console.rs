//! Console logger implementation

use super::traits::{LogLevel, Logger};

/// A logger that writes to the console
///
/// Info goes to stdout, everything else to stderr. Messages below
/// `min_level` are dropped.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    prefix: String,
    min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleLogger {
    /// Create a console logger with the default prefix, logging everything
    pub fn new() -> Self {
        Self {
            prefix: "[McpFlow]".to_string(),
            min_level: LogLevel::Debug,
        }
    }

    /// Create a console logger with a custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::new()
        }
    }

    /// Drop messages below `level`
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    fn format(&self, level: LogLevel, message: &str) -> Option<String> {
        (level >= self.min_level).then(|| format!("{} {}: {}", self.prefix, level.as_str(), message))
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if let Some(line) = self.format(level, message) {
            match level {
                LogLevel::Info => println!("{}", line),
                _ => eprintln!("{}", line),
            }
        }
    }
}

impl Logger for ConsoleLogger {
    fn debug(&self, message: &str) {
        self.emit(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.emit(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.emit(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logger_creation() {
        let logger = ConsoleLogger::new();
        assert_eq!(logger.prefix, "[McpFlow]");

        let custom = ConsoleLogger::with_prefix("[Host]");
        assert_eq!(custom.prefix, "[Host]");
        assert_eq!(custom.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_line_format_and_threshold() {
        let logger = ConsoleLogger::new().with_min_level(LogLevel::Warn);
        assert_eq!(logger.format(LogLevel::Info, "hidden"), None);
        assert_eq!(
            logger.format(LogLevel::Error, "[Retry] gave up"),
            Some("[McpFlow] ERROR: [Retry] gave up".to_string())
        );
    }
}
