use chrono::{DateTime, Utc};

use crate::field::Field;
use crate::level::Level;

/// An immutable, fully-formed log record. Built by [`crate::logger::Logger`]
/// and handed to every configured sink exactly once.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    /// Logger name, if set via `Init` or `WithName`.
    pub name: Option<String>,
    /// `file:line` of the call site, when caller info is enabled.
    pub caller: Option<String>,
    /// Context-extracted fields first, then explicit fields, insertion order.
    pub fields: Vec<(String, Field)>,
    /// Captured when stack traces are enabled and the level meets the
    /// configured threshold, and no structured error stack was supplied.
    pub stacktrace: Option<String>,
    /// Populated instead of `stacktrace` when the logged error already
    /// carries a structured stack (`errorVerbose`).
    pub error_verbose: Option<String>,
}

impl LogRecord {
    pub fn timestamp_rfc3339_ms(&self) -> String {
        self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}
