//! The record handed to sinks.
//!
//! A [`LogRecord`] is a [`LogEvent`] stamped by the emitter with the service
//! name and the emission instant. Serialising a record yields one flat JSON
//! object; the reserved keys always come from the record itself, so a caller
//! field named e.g. `level` can never mask the real level.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{
    event::{Fields, LogEvent, LogType, fields},
    level::Level,
};

#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    service: Arc<str>,
    timestamp: DateTime<Utc>,
    level: Level,
    log_type: LogType,
    message: String,
    fields: Fields,
}

impl LogRecord {
    /// Stamp `event` with `service` and the current time.
    pub fn stamp(service: Arc<str>, event: LogEvent) -> Self {
        Self::stamp_at(service, event, Utc::now())
    }

    /// Stamp `event` with an explicit timestamp.
    pub fn stamp_at(service: Arc<str>, event: LogEvent, timestamp: DateTime<Utc>) -> Self {
        let LogEvent {
            level,
            log_type,
            message,
            fields,
        } = event;
        Self {
            service,
            timestamp,
            level,
            log_type,
            message,
            fields,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// RFC 3339 timestamp with millisecond precision, e.g.
    /// `2024-05-01T12:00:00.123Z`.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn log_type(&self) -> LogType {
        self.log_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    fn extra_fields(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.fields
            .iter()
            .filter(|(key, _)| !fields::RESERVED.contains(&key.as_str()))
    }
}

impl Serialize for LogRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(fields::TIMESTAMP, &self.timestamp_string())?;
        map.serialize_entry(fields::LEVEL, &self.level)?;
        map.serialize_entry(fields::MESSAGE, &self.message)?;
        map.serialize_entry(fields::SERVICE, &*self.service)?;
        map.serialize_entry(fields::LOG_TYPE, &self.log_type)?;
        for (key, value) in self.extra_fields() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
