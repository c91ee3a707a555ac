//! Application configuration.
//!
//! Settings resolve in increasing precedence: built-in defaults, an optional
//! INI file, then environment variables. The demo binary applies its CLI
//! flags on top. Every layer is validated as it is applied, so a bad value
//! names the key it came from.

use std::{fmt::Display, fs, io, path::Path, str::FromStr, time::Duration};

use ini::{Ini, Properties};
use thiserror::Error;

use crate::{
    builders::StreamSinkBuilder,
    health::DEFAULT_HEALTH_INTERVAL,
    level::Level,
    stream_sink::{DEFAULT_BUFFER_LENGTH, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RECONNECT_INTERVAL},
};

pub const DEFAULT_SERVICE: &str = "express-app";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Environment variable names.
pub mod env_keys {
    pub const SERVICE: &str = "SERVICE_NAME";
    pub const ENVIRONMENT: &str = "APP_ENV";
    pub const LEVEL: &str = "LOG_LEVEL";
    pub const COLLECTOR_ENABLED: &str = "COLLECTOR_ENABLED";
    pub const COLLECTOR_HOST: &str = "COLLECTOR_HOST";
    pub const COLLECTOR_PORT: &str = "COLLECTOR_PORT";
    pub const COLLECTOR_RECONNECT_INTERVAL_MS: &str = "COLLECTOR_RECONNECT_INTERVAL_MS";
    pub const COLLECTOR_BUFFER_LENGTH: &str = "COLLECTOR_BUFFER_LENGTH";
    pub const HTTP_PORT: &str = "PORT";
    pub const HEALTH_INTERVAL_MS: &str = "HEALTH_INTERVAL_MS";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{path} is invalid: {source}")]
    Parse {
        path: String,
        #[source]
        source: ini::ParseError,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Where records are forwarded besides the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectorConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub reconnect_interval: Duration,
    pub buffer_length: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            buffer_length: DEFAULT_BUFFER_LENGTH,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub service: String,
    pub environment: String,
    pub level: Level,
    pub collector: CollectorConfig,
    pub http_port: u16,
    pub health_interval: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_owned(),
            environment: DEFAULT_ENVIRONMENT.to_owned(),
            level: Level::Info,
            collector: CollectorConfig::default(),
            http_port: DEFAULT_HTTP_PORT,
            health_interval: DEFAULT_HEALTH_INTERVAL,
        }
    }
}

impl AppConfig {
    /// Defaults, then `path` (if given), then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_ini_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_ini_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let ini = Ini::load_from_str(&text).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        let mut config = Self::default();
        config.apply_ini(&ini)?;
        Ok(config)
    }

    /// Apply keys from the root section and the `[collector]`, `[http]`, and
    /// `[health]` sections. Unknown keys are ignored.
    pub fn apply_ini(&mut self, ini: &Ini) -> Result<(), ConfigError> {
        let root = ini.general_section();
        set_string(&mut self.service, root, "service", "service")?;
        if let Some(raw) = root.get("environment").and_then(blank_as_unset) {
            self.environment = raw;
        }
        if let Some(raw) = root.get("level") {
            self.level = parse_value("level", raw)?;
        }
        if let Some(section) = ini.section(Some("collector")) {
            let collector = &mut self.collector;
            if let Some(raw) = section.get("enabled") {
                collector.enabled = parse_bool("collector.enabled", raw)?;
            }
            set_string(&mut collector.host, section, "host", "collector.host")?;
            if let Some(raw) = section.get("port") {
                collector.port = parse_port("collector.port", raw)?;
            }
            if let Some(raw) = section.get("reconnect_interval_ms") {
                collector.reconnect_interval =
                    parse_millis("collector.reconnect_interval_ms", raw)?;
            }
            if let Some(raw) = section.get("buffer_length") {
                collector.buffer_length = parse_positive("collector.buffer_length", raw)?;
            }
        }
        if let Some(raw) = ini.section(Some("http")).and_then(|s| s.get("port")) {
            self.http_port = parse_port("http.port", raw)?;
        }
        if let Some(raw) = ini.section(Some("health")).and_then(|s| s.get("interval_ms")) {
            self.health_interval = parse_millis("health.interval_ms", raw)?;
        }
        Ok(())
    }

    /// Apply environment overrides read through `lookup`, so tests can
    /// supply variables without touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        use env_keys::*;

        if let Some(raw) = lookup(SERVICE) {
            self.service = non_empty(SERVICE, &raw)?;
        }
        // Blank leaves the default environment name in place.
        if let Some(raw) = lookup(ENVIRONMENT).as_deref().and_then(blank_as_unset) {
            self.environment = raw;
        }
        if let Some(raw) = lookup(LEVEL) {
            self.level = parse_value(LEVEL, &raw)?;
        }
        if let Some(raw) = lookup(COLLECTOR_ENABLED) {
            self.collector.enabled = parse_bool(COLLECTOR_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(COLLECTOR_HOST) {
            self.collector.host = non_empty(COLLECTOR_HOST, &raw)?;
        }
        if let Some(raw) = lookup(COLLECTOR_PORT) {
            self.collector.port = parse_port(COLLECTOR_PORT, &raw)?;
        }
        if let Some(raw) = lookup(COLLECTOR_RECONNECT_INTERVAL_MS) {
            self.collector.reconnect_interval = parse_millis(COLLECTOR_RECONNECT_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(COLLECTOR_BUFFER_LENGTH) {
            self.collector.buffer_length = parse_positive(COLLECTOR_BUFFER_LENGTH, &raw)?;
        }
        if let Some(raw) = lookup(HTTP_PORT) {
            self.http_port = parse_port(HTTP_PORT, &raw)?;
        }
        if let Some(raw) = lookup(HEALTH_INTERVAL_MS) {
            self.health_interval = parse_millis(HEALTH_INTERVAL_MS, &raw)?;
        }
        Ok(())
    }

    /// Builder for the collector sink described by this config.
    pub fn stream_sink_builder(&self) -> StreamSinkBuilder {
        let interval_ms = u64::try_from(self.collector.reconnect_interval.as_millis()).unwrap_or(u64::MAX);
        StreamSinkBuilder::new()
            .with_tcp(self.collector.host.clone(), self.collector.port)
            .with_reconnect_interval_ms(interval_ms)
            .with_buffer_length(self.collector.buffer_length)
    }
}

fn set_string(
    target: &mut String,
    section: &Properties,
    name: &str,
    key: &str,
) -> Result<(), ConfigError> {
    if let Some(raw) = section.get(name) {
        *target = non_empty(key, raw)?;
    }
    Ok(())
}

fn non_empty(key: &str, raw: &str) -> Result<String, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::invalid(key, "must not be empty"));
    }
    Ok(value.to_owned())
}

fn blank_as_unset(raw: &str) -> Option<String> {
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::invalid(key, err.to_string()))
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    let value: T = parse_value(key, raw)?;
    if value == T::default() {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn parse_port(key: &str, raw: &str) -> Result<u16, ConfigError> {
    parse_positive(key, raw)
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    parse_positive(key, raw).map(Duration::from_millis)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(
            key,
            format!("'{other}' is not a boolean"),
        )),
    }
}
