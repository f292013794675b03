// Audit log records shared by the store, the view and the /log mirror
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// One structured UI action.
///
/// The timestamp travels as `ts` because that is the field the aggregator's
/// `/log` endpoint deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "ts")]
    pub timestamp: String,
    pub level: LogLevel,
    pub user: String,
    pub event: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl LogEntry {
    /// Stamps a new entry with the current UTC time (ISO-8601, millisecond precision).
    pub fn now(
        level: LogLevel,
        user: impl Into<String>,
        event: impl Into<String>,
        details: Map<String, Value>,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level,
            user: user.into(),
            event: event.into(),
            details,
        }
    }
}

/// Builds a details map from a `serde_json::json!` object literal.
/// Anything other than an object becomes an empty map.
pub fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
