//! Log entries, severities and the console logger
//!
//! Every entry carries a source tag naming the component that emitted it
//! (`orbit::FramePipeline`, `orbit::Admission`, `orbit::FrameSlotRing`,
//! `orbit::vulkan`). Per-tick traces use `Trace`; admission stalls and
//! present failures use `Warn`; lost completions and backend failures use
//! `Error` and record the emitting file and line.

use colored::*;
use std::fmt;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Receives every entry that passes the engine's severity floor
///
/// Called from whichever thread logged, including the fence watcher.
///
/// ```no_run
/// use orbit_engine::orbit::log::{Logger, LogEntry, LogSeverity};
///
/// /// Collects hang and lost-completion reports for a crash dump
/// struct FailureLog(std::sync::Mutex<Vec<String>>);
///
/// impl Logger for FailureLog {
///     fn log(&self, entry: &LogEntry) {
///         if entry.severity >= LogSeverity::Warn {
///             self.0.lock().unwrap().push(entry.to_string());
///         }
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Component tag, e.g. "orbit::FramePipeline"
    pub source: String,
    pub message: String,
    /// Emitting file, set for `Error` entries
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    /// Entry stamped with the current time and no source location
    pub fn new(severity: LogSeverity, source: &str, message: String) -> Self {
        Self {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        }
    }

    pub fn with_location(mut self, file: &'static str, line: u32) -> Self {
        self.file = Some(file);
        self.line = Some(line);
        self
    }

    /// `file:line` of the emitting call, if recorded
    pub fn location(&self) -> Option<String> {
        match (self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        }
    }
}

/// `[SEVERITY] [source] message (file:line)`, without timestamp or colour
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [{}] {}", self.severity.label(), self.source, self.message)?;
        if let Some(location) = self.location() {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_label(&self) -> ColoredString {
        let label = self.label();
        match self {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        }
    }
}

/// Coloured stdout logger, `[timestamp] [SEVERITY] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let severity = entry.severity.colored_label();
        let source = entry.source.bright_blue();

        match entry.location() {
            Some(location) => println!(
                "[{}] [{}] [{}] {} ({})",
                timestamp, severity, source, entry.message, location
            ),
            None => println!("[{}] [{}] [{}] {}", timestamp, severity, source, entry.message),
        }
    }
}

// ===== LOGGING MACROS =====

/// Per-tick detail: submissions, completions, slot claims
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::orbit::Engine::log(
            $crate::orbit::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::orbit::Engine::log(
            $crate::orbit::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Setup and shutdown milestones
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::orbit::Engine::log(
            $crate::orbit::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Recoverable trouble: stalls, aborted ticks, present failures
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::orbit::Engine::log(
            $crate::orbit::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::orbit::Engine::log_detailed(
            $crate::orbit::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::BackendError` carrying the same text
///
/// Useful inside `map_err` closures.
///
/// # Example
///
/// ```no_run
/// # fn submit() -> std::result::Result<(), i32> { Err(-4) }
/// # fn run() -> orbit_engine::orbit::Result<()> {
/// submit().map_err(|e| orbit_engine::engine_err!("orbit::vulkan", "Submit failed: {:?}", e))?;
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::orbit::Engine::log_detailed(
            $crate::orbit::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::orbit::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with `Err(Error::BackendError(..))`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
