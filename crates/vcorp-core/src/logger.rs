// Structured platform logger with colored output, level filtering, and
// custom log handler support. Process-wide, read-only after startup.

use std::fmt;
use std::sync::Arc;

/// ANSI color codes.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub mod fg {
        pub const RED: &str = "\x1b[31m";
        pub const GREEN: &str = "\x1b[32m";
        pub const YELLOW: &str = "\x1b[33m";
        pub const BLUE: &str = "\x1b[34m";
        pub const MAGENTA: &str = "\x1b[35m";
    }
}

/// Log levels, lowest to highest severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Success = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    /// ANSI color for this log level.
    pub fn color(&self) -> &'static str {
        match self {
            LogLevel::Debug => ansi::fg::MAGENTA,
            LogLevel::Info => ansi::fg::BLUE,
            LogLevel::Success => ansi::fg::GREEN,
            LogLevel::Warn => ansi::fg::YELLOW,
            LogLevel::Error => ansi::fg::RED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => Self::Debug,
            "info" => Self::Info,
            "success" => Self::Success,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Warn,
        }
    }
}

/// Logger configuration options.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Whether logging is disabled entirely.
    pub disabled: bool,
    /// Whether to disable ANSI color output.
    pub disable_colors: bool,
    /// The minimum log level to emit.
    pub level: LogLevel,
    /// Optional custom log handler (overrides default stderr/stdout output).
    pub custom_handler: Option<Arc<dyn LogHandler>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            disable_colors: false,
            level: LogLevel::Warn,
            custom_handler: None,
        }
    }
}

/// Custom log handler trait for user-provided logging backends.
pub trait LogHandler: Send + Sync + fmt::Debug {
    fn handle(&self, level: LogLevel, message: &str, args: &[&str]);
}

/// The internal logger used throughout the platform.
#[derive(Clone)]
pub struct AuthLogger {
    config: LoggerConfig,
}

impl fmt::Debug for AuthLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthLogger")
            .field("level", &self.config.level)
            .field("disabled", &self.config.disabled)
            .finish()
    }
}

impl AuthLogger {
    /// Create a new logger with the given configuration.
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    /// Get the current log level.
    pub fn level(&self) -> LogLevel {
        self.config.level
    }

    /// Whether a given level should be published.
    pub fn should_publish(&self, level: LogLevel) -> bool {
        if self.config.disabled {
            return false;
        }
        level >= self.config.level
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, &[]);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, &[]);
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Success, message, &[]);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, &[]);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, &[]);
    }

    /// Log a message with extra arguments.
    pub fn log(&self, level: LogLevel, message: &str, args: &[&str]) {
        if !self.should_publish(level) {
            return;
        }

        if let Some(ref handler) = self.config.custom_handler {
            // Custom handlers only see the four standard levels.
            let handler_level = if level == LogLevel::Success {
                LogLevel::Info
            } else {
                level
            };
            handler.handle(handler_level, message, args);
            return;
        }

        let formatted = self.format_message(level, message);

        match level {
            LogLevel::Error | LogLevel::Warn => {
                eprintln!("{}{}", formatted, format_args_str(args))
            }
            _ => println!("{}{}", formatted, format_args_str(args)),
        }
    }

    /// Format a log message with timestamp, level, and prefix.
    fn format_message(&self, level: LogLevel, message: &str) -> String {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        if self.config.disable_colors {
            format!("{} {} [VCorp]: {}", timestamp, level.as_str(), message)
        } else {
            format!(
                "{dim}{timestamp}{reset} {color}{level}{reset} {bright}[VCorp]:{reset} {message}",
                dim = ansi::DIM,
                reset = ansi::RESET,
                color = level.color(),
                level = level.as_str(),
                bright = ansi::BRIGHT,
                timestamp = timestamp,
                message = message,
            )
        }
    }
}

impl Default for AuthLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}

/// Format additional log arguments for output.
fn format_args_str(args: &[&str]) -> String {
    if args.is_empty() {
        String::new()
    } else {
        format!(" {}", args.join(" "))
    }
}
