//! Builder for [`StreamSink`].
//!
//! Exposes the collector address, reconnect interval, buffer length, and
//! socket timeouts. Values left unset fall back to the
//! [`StreamSinkConfig`] defaults.

use std::{sync::Arc, time::Duration};

use crate::{
    formatter::SharedFormatter,
    sink::LogSink,
    stream_sink::{StreamSink, StreamSinkConfig, TcpTransport},
};

use super::{SinkBuildError, SinkBuilderTrait, ensure_positive, option_setter};

/// Builder for constructing [`StreamSink`] instances.
#[derive(Clone, Debug, Default)]
pub struct StreamSinkBuilder {
    transport: Option<TcpTransport>,
    reconnect_interval_ms: Option<u64>,
    buffer_length: Option<usize>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    flush_timeout_ms: Option<u64>,
    max_frame_size: Option<usize>,
    formatter: Option<SharedFormatter>,
}

impl StreamSinkBuilder {
    /// Create a builder with no collector configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.transport = Some(TcpTransport::new(host, port));
        self
    }

    option_setter!(
        #[doc = "Fixed delay between reconnection attempts, in milliseconds."]
        with_reconnect_interval_ms,
        reconnect_interval_ms,
        u64
    );
    option_setter!(
        #[doc = "Frames kept while disconnected; the oldest is dropped beyond this."]
        with_buffer_length,
        buffer_length,
        usize
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(with_flush_timeout_ms, flush_timeout_ms, u64);
    option_setter!(with_max_frame_size, max_frame_size, usize);

    pub fn with_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    fn validate_transport(&self) -> Result<&TcpTransport, SinkBuildError> {
        match &self.transport {
            None => Err(SinkBuildError::InvalidConfig(
                "stream sink requires a tcp transport".into(),
            )),
            Some(transport) if transport.host.trim().is_empty() => Err(
                SinkBuildError::InvalidConfig("tcp host must not be empty".into()),
            ),
            Some(transport) if transport.port == 0 => Err(SinkBuildError::InvalidConfig(
                "tcp port must be greater than zero".into(),
            )),
            Some(transport) => Ok(transport),
        }
    }

    /// Validate the settings and produce a config without spawning a worker.
    pub fn build_config(&self) -> Result<StreamSinkConfig, SinkBuildError> {
        let mut config = StreamSinkConfig::default().with_transport(self.validate_transport()?.clone());
        if let Some(interval) = self.reconnect_interval_ms {
            let interval = ensure_positive!(interval, "reconnect_interval_ms")?;
            config.reconnect_interval = Duration::from_millis(interval);
        }
        if let Some(length) = self.buffer_length {
            config.buffer_length = ensure_positive!(length, "buffer_length")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout =
                Duration::from_millis(ensure_positive!(timeout, "connect_timeout_ms")?);
        }
        if let Some(timeout) = self.write_timeout_ms {
            config.write_timeout =
                Duration::from_millis(ensure_positive!(timeout, "write_timeout_ms")?);
        }
        if let Some(timeout) = self.flush_timeout_ms {
            config.flush_timeout =
                Duration::from_millis(ensure_positive!(timeout, "flush_timeout_ms")?);
        }
        if let Some(size) = self.max_frame_size {
            config.max_frame_size = ensure_positive!(size, "max_frame_size")?;
        }
        if let Some(formatter) = &self.formatter {
            config.formatter = formatter.clone();
        }
        Ok(config)
    }

    pub fn build(&self) -> Result<StreamSink, SinkBuildError> {
        Ok(StreamSink::with_config(self.build_config()?)?)
    }
}

impl SinkBuilderTrait for StreamSinkBuilder {
    fn build_sink(&self) -> Result<Arc<dyn LogSink>, SinkBuildError> {
        Ok(Arc::new(self.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream_sink::{DEFAULT_BUFFER_LENGTH, DEFAULT_RECONNECT_INTERVAL};
    use rstest::rstest;

    #[rstest]
    fn requires_transport() {
        let err = StreamSinkBuilder::new()
            .build_config()
            .expect_err("transport must be required");
        assert!(matches!(err, SinkBuildError::InvalidConfig(msg) if msg.contains("transport")));
    }

    #[rstest]
    fn rejects_blank_host() {
        let err = StreamSinkBuilder::new()
            .with_tcp("  ", 5000)
            .build_config()
            .expect_err("blank host must fail");
        assert!(matches!(err, SinkBuildError::InvalidConfig(msg) if msg.contains("host")));
    }

    #[rstest]
    #[case::interval(StreamSinkBuilder::new().with_tcp("localhost", 5000).with_reconnect_interval_ms(0), "reconnect_interval_ms")]
    #[case::buffer(StreamSinkBuilder::new().with_tcp("localhost", 5000).with_buffer_length(0), "buffer_length")]
    #[case::frame(StreamSinkBuilder::new().with_tcp("localhost", 5000).with_max_frame_size(0), "max_frame_size")]
    #[case::connect(StreamSinkBuilder::new().with_tcp("localhost", 5000).with_connect_timeout_ms(0), "connect_timeout_ms")]
    fn rejects_zero_values(#[case] builder: StreamSinkBuilder, #[case] field: &str) {
        let err = builder.build_config().expect_err("zero must be rejected");
        assert!(matches!(err, SinkBuildError::InvalidConfig(msg) if msg.contains(field)));
    }

    #[rstest]
    fn unset_values_use_defaults() {
        let config = StreamSinkBuilder::new()
            .with_tcp("collector", 6000)
            .build_config()
            .expect("valid builder");
        assert_eq!(config.transport, TcpTransport::new("collector", 6000));
        assert_eq!(config.reconnect_interval, DEFAULT_RECONNECT_INTERVAL);
        assert_eq!(config.buffer_length, DEFAULT_BUFFER_LENGTH);
    }

    #[rstest]
    fn applies_overrides() {
        let config = StreamSinkBuilder::new()
            .with_tcp("collector", 6000)
            .with_reconnect_interval_ms(250)
            .with_buffer_length(3)
            .build_config()
            .expect("valid builder");
        assert_eq!(config.reconnect_interval, Duration::from_millis(250));
        assert_eq!(config.buffer_length, 3);
    }
}
