//! Record formatters shared by the sinks.
//!
//! Formatting is fallible so a sink can substitute [`fallback_line`] when a
//! record cannot be encoded, instead of going silent.

use std::{fmt, sync::Arc};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::{event::fields, log_record::LogRecord};

/// Marker written in place of a record that failed to serialise.
pub const SERIALIZATION_ERROR_MARKER: &str = "internal serialization error";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to serialise record: {0}")]
    Serialise(#[from] serde_json::Error),
}

/// Trait for turning a record into a single line of text (no trailing
/// newline).
///
/// Implementors must be `Send + Sync` so a formatter can be shared with sink
/// worker threads.
pub trait RecordFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Result<String, FormatError>;
}

/// One JSON object per record.
#[derive(Copy, Clone, Debug, Default)]
pub struct JsonFormatter;

impl RecordFormatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Result<String, FormatError> {
        Ok(serde_json::to_string(record)?)
    }
}

/// Shared formatter trait object used across sinks.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn RecordFormatter>,
}

impl SharedFormatter {
    pub fn new<F>(formatter: F) -> Self
    where
        F: RecordFormatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    pub fn format(&self, record: &LogRecord) -> Result<String, FormatError> {
        self.inner.format(record)
    }

    /// Format `record`, substituting [`fallback_line`] on failure.
    pub fn format_or_fallback(&self, record: &LogRecord) -> String {
        self.format(record).unwrap_or_else(|err| {
            log::warn!("relaylog: {err}; writing fallback record");
            fallback_line(record)
        })
    }
}

impl Default for SharedFormatter {
    fn default() -> Self {
        Self::new(JsonFormatter)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn RecordFormatter>)")
    }
}

/// Minimal record built only from plain strings, so encoding it cannot fail.
pub fn fallback_line(record: &LogRecord) -> String {
    let mut map = Map::new();
    let entries = [
        (fields::TIMESTAMP, record.timestamp_string()),
        (fields::LEVEL, record.level().as_str().to_owned()),
        (fields::MESSAGE, record.message().to_owned()),
        (fields::SERVICE, record.service().to_owned()),
        (fields::LOG_TYPE, record.log_type().as_str().to_owned()),
        (fields::ERROR, SERIALIZATION_ERROR_MARKER.to_owned()),
    ];
    for (key, value) in entries {
        map.insert(key.to_owned(), Value::String(value));
    }
    Value::Object(map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::{LogEvent, LogType},
        level::Level,
    };
    use serde_json::Value;
    use static_assertions::assert_impl_all;

    struct FailingFormatter;

    impl RecordFormatter for FailingFormatter {
        fn format(&self, _record: &LogRecord) -> Result<String, FormatError> {
            use serde::ser::Error as _;
            Err(serde_json::Error::custom("field cannot be encoded").into())
        }
    }

    fn record() -> LogRecord {
        LogRecord::stamp(
            Arc::from("svc"),
            LogEvent::new(Level::Warn, LogType::System, "hello"),
        )
    }

    #[test]
    fn shared_formatter_is_send_sync() {
        assert_impl_all!(SharedFormatter: Send, Sync);
    }

    #[test]
    fn json_formatter_emits_single_line() {
        let line = JsonFormatter.format(&record()).expect("format record");
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).expect("valid json");
        assert_eq!(value["message"], "hello");
        assert_eq!(value["level"], "warn");
    }

    #[test]
    fn failing_formatter_falls_back_to_minimal_record() {
        let formatter = SharedFormatter::new(FailingFormatter);
        let line = formatter.format_or_fallback(&record());
        let value: Value = serde_json::from_str(&line).expect("fallback is valid json");
        assert_eq!(value["level"], "warn");
        assert_eq!(value["message"], "hello");
        assert_eq!(value["error"], SERIALIZATION_ERROR_MARKER);
        assert!(value["timestamp"].is_string());
    }
}
