//! Canonical field schema for every kind of structured log event.
//!
//! Call sites build a [`LogEvent`] through the constructors below rather than
//! assembling JSON by hand, so the console and collector sinks always agree
//! on field names for the same logical event. Field names are additive only:
//! once a name appears in [`fields`] it is never renamed or removed.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::level::Level;

/// Open-ended mapping of additional fields carried by an event.
pub type Fields = Map<String, Value>;

/// Field names shared by every producer and consumer of records.
pub mod fields {
    pub const TIMESTAMP: &str = "timestamp";
    pub const LEVEL: &str = "level";
    pub const MESSAGE: &str = "message";
    pub const SERVICE: &str = "service";
    pub const LOG_TYPE: &str = "logType";

    pub const METHOD: &str = "method";
    pub const URL: &str = "url";
    pub const IP: &str = "ip";
    pub const USER_AGENT: &str = "userAgent";

    pub const ROUTE: &str = "route";
    pub const ACTION: &str = "action";
    pub const USER_DATA: &str = "userData";

    pub const ERROR: &str = "error";
    pub const STACK: &str = "stack";

    pub const TYPE: &str = "type";
    pub const UPTIME: &str = "uptime";
    pub const MEMORY: &str = "memory";
    pub const HOSTNAME: &str = "hostname";
    pub const PROCESS_ID: &str = "processId";
    pub const RUNTIME_VERSION: &str = "runtimeVersion";
    pub const ENVIRONMENT: &str = "environment";

    pub const PORT: &str = "port";

    /// Keys composed by the emitter that caller fields may never override.
    pub const RESERVED: [&str; 5] = [TIMESTAMP, LEVEL, MESSAGE, SERVICE, LOG_TYPE];
}

/// Category used by downstream consumers to filter records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Request,
    Route,
    Api,
    Error,
    Health,
    System,
}

impl LogType {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogType::Request => "request",
            LogType::Route => "route",
            LogType::Api => "api",
            LogType::Error => "error",
            LogType::Health => "health",
            LogType::System => "system",
        }
    }
}

/// Metadata of an inbound request, captured once and shared by every event
/// logged while handling it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: String,
    /// Path plus query string, as received.
    pub url: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ip: None,
            user_agent: None,
        }
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Memory breakdown reported by health events, in bytes.
///
/// `None` marks a metric the platform could not provide; it serialises as
/// `null` so the field set stays stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub rss: Option<u64>,
    pub heap_total: Option<u64>,
    pub heap_used: Option<u64>,
    pub external: Option<u64>,
    pub array_buffers: Option<u64>,
}

/// One sample of process health.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthSnapshot {
    /// Seconds since process start.
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub hostname: String,
    pub process_id: u32,
    pub runtime_version: String,
    pub environment: String,
}

/// A structured event as constructed at the call site.
///
/// The emitter attaches `service` and `timestamp` when the event is emitted,
/// not here.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    pub level: Level,
    pub log_type: LogType,
    pub message: String,
    pub fields: Fields,
}

fn opt_str(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_owned()))
}

fn opt_u64(value: Option<u64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

impl LogEvent {
    pub fn new(level: Level, log_type: LogType, message: impl Into<String>) -> Self {
        Self {
            level,
            log_type,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    /// Attach an additional field, replacing any earlier value for `key`.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Every inbound request: `"{method} {url}"`.
    pub fn request(meta: &RequestMeta) -> Self {
        Self::new(
            Level::Info,
            LogType::Request,
            format!("{} {}", meta.method, meta.url),
        )
        .with_field(fields::METHOD, meta.method.as_str())
        .with_field(fields::URL, meta.url.as_str())
        .with_field(fields::IP, opt_str(meta.ip.as_deref()))
        .with_field(fields::USER_AGENT, opt_str(meta.user_agent.as_deref()))
    }

    /// A page route performed `action`.
    pub fn route(meta: &RequestMeta, route: &str, action: &str, message: impl Into<String>) -> Self {
        Self::action(Level::Info, LogType::Route, meta, route, action, message)
    }

    /// An API route performed `action`.
    pub fn api(meta: &RequestMeta, route: &str, action: &str, message: impl Into<String>) -> Self {
        Self::action(Level::Info, LogType::Api, meta, route, action, message)
    }

    /// A route reported an error it handled itself.
    pub fn route_error(
        meta: &RequestMeta,
        route: &str,
        action: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::action(Level::Error, LogType::Error, meta, route, action, message)
    }

    fn action(
        level: Level,
        log_type: LogType,
        meta: &RequestMeta,
        route: &str,
        action: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(level, log_type, message)
            .with_field(fields::ROUTE, route)
            .with_field(fields::ACTION, action)
            .with_field(fields::METHOD, meta.method.as_str())
            .with_field(fields::URL, meta.url.as_str())
    }

    /// An error escaped a request handler.
    ///
    /// `stack` carries the rendered source chain of `error`, one cause per
    /// line, outermost first.
    pub fn unhandled_error(meta: &RequestMeta, error: &str, stack: &str) -> Self {
        Self::new(Level::Error, LogType::Error, "Unhandled error occurred")
            .with_field(fields::ERROR, error)
            .with_field(fields::STACK, stack)
            .with_field(fields::URL, meta.url.as_str())
            .with_field(fields::METHOD, meta.method.as_str())
    }

    /// Periodic process health sample.
    pub fn health(snapshot: &HealthSnapshot) -> Self {
        let memory = &snapshot.memory;
        Self::new(Level::Info, LogType::Health, "Periodic health check log")
            .with_field(fields::TYPE, "periodic")
            .with_field(fields::UPTIME, snapshot.uptime)
            .with_field(
                fields::MEMORY,
                json!({
                    "rss": opt_u64(memory.rss),
                    "heapTotal": opt_u64(memory.heap_total),
                    "heapUsed": opt_u64(memory.heap_used),
                    "external": opt_u64(memory.external),
                    "arrayBuffers": opt_u64(memory.array_buffers),
                }),
            )
            .with_field(fields::HOSTNAME, snapshot.hostname.as_str())
            .with_field(fields::PROCESS_ID, snapshot.process_id)
            .with_field(fields::RUNTIME_VERSION, snapshot.runtime_version.as_str())
            .with_field(fields::ENVIRONMENT, snapshot.environment.as_str())
    }

    /// The HTTP listener is up.
    pub fn system_start(port: u16) -> Self {
        Self::new(
            Level::Info,
            LogType::System,
            format!("Express app listening on port {port}"),
        )
        .with_field(fields::ACTION, "server_start")
        .with_field(fields::PORT, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn meta() -> RequestMeta {
        RequestMeta::new("GET", "/api/users?page=2")
            .with_ip("127.0.0.1")
            .with_user_agent("curl/8.0")
    }

    #[rstest]
    fn request_event_carries_request_fields(meta: RequestMeta) {
        let event = LogEvent::request(&meta);
        assert_eq!(event.level, Level::Info);
        assert_eq!(event.log_type, LogType::Request);
        assert_eq!(event.message, "GET /api/users?page=2");
        assert_eq!(event.fields[fields::METHOD], "GET");
        assert_eq!(event.fields[fields::URL], "/api/users?page=2");
        assert_eq!(event.fields[fields::IP], "127.0.0.1");
        assert_eq!(event.fields[fields::USER_AGENT], "curl/8.0");
    }

    #[test]
    fn request_event_keeps_missing_metadata_as_null() {
        let event = LogEvent::request(&RequestMeta::new("POST", "/"));
        assert_eq!(event.fields[fields::IP], Value::Null);
        assert_eq!(event.fields[fields::USER_AGENT], Value::Null);
    }

    #[rstest]
    fn route_and_request_events_share_correlation_fields(meta: RequestMeta) {
        let request = LogEvent::request(&meta);
        let api = LogEvent::api(&meta, "/api/users", "fetch_users", "Fetching users list");
        for key in [fields::METHOD, fields::URL] {
            assert_eq!(request.fields[key], api.fields[key], "mismatch on {key}");
        }
        assert_eq!(api.fields[fields::ROUTE], "/api/users");
        assert_eq!(api.fields[fields::ACTION], "fetch_users");
    }

    #[rstest]
    fn route_error_is_error_level(meta: RequestMeta) {
        let event = LogEvent::route_error(&meta, "/api/error", "simulate_error", "boom");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.log_type, LogType::Error);
    }

    #[rstest]
    fn unhandled_error_captures_error_and_stack(meta: RequestMeta) {
        let event = LogEvent::unhandled_error(&meta, "bad body", "bad body\nEOF while parsing");
        assert_eq!(event.message, "Unhandled error occurred");
        assert_eq!(event.fields[fields::ERROR], "bad body");
        assert_eq!(event.fields[fields::STACK], "bad body\nEOF while parsing");
        assert_eq!(event.fields[fields::METHOD], "GET");
    }

    #[test]
    fn health_event_serialises_full_memory_breakdown() {
        let snapshot = HealthSnapshot {
            uptime: 12.5,
            memory: MemoryUsage {
                rss: Some(1024),
                heap_total: Some(2048),
                heap_used: None,
                external: Some(0),
                array_buffers: Some(4),
            },
            hostname: "web-1".into(),
            process_id: 42,
            runtime_version: "relaylog/0.1.0".into(),
            environment: "development".into(),
        };
        let event = LogEvent::health(&snapshot);
        assert_eq!(event.log_type, LogType::Health);
        assert_eq!(event.fields[fields::TYPE], "periodic");
        assert_eq!(event.fields[fields::UPTIME], 12.5);
        let memory = &event.fields[fields::MEMORY];
        assert_eq!(memory["rss"], 1024);
        assert_eq!(memory["heapTotal"], 2048);
        assert_eq!(memory["heapUsed"], Value::Null);
        assert_eq!(memory["arrayBuffers"], 4);
        assert_eq!(event.fields[fields::PROCESS_ID], 42);
        assert_eq!(event.fields[fields::ENVIRONMENT], "development");
    }

    #[test]
    fn system_start_reports_port() {
        let event = LogEvent::system_start(3000);
        assert_eq!(event.message, "Express app listening on port 3000");
        assert_eq!(event.fields[fields::ACTION], "server_start");
        assert_eq!(event.fields[fields::PORT], 3000);
    }

    #[test]
    fn log_type_serialises_lowercase() {
        let json = serde_json::to_string(&LogType::Api).expect("serialise log type");
        assert_eq!(json, "\"api\"");
        assert_eq!(LogType::Health.as_str(), "health");
    }
}
