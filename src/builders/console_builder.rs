//! Builder for [`ConsoleSink`].
//!
//! Targets `stdout` or `stderr` and exposes the channel capacity, flush
//! timeout, and overflow policy.

use std::{sync::Arc, time::Duration};

use crate::{
    console_sink::{ConsoleSink, ConsoleSinkConfig, OverflowPolicy},
    formatter::SharedFormatter,
    sink::LogSink,
};

use super::{SinkBuildError, SinkBuilderTrait, ensure_positive, option_setter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Builder for constructing [`ConsoleSink`] instances.
#[derive(Clone, Debug)]
pub struct ConsoleSinkBuilder {
    target: ConsoleTarget,
    capacity: Option<usize>,
    flush_timeout_ms: Option<u64>,
    overflow_timeout_ms: Option<u64>,
    formatter: SharedFormatter,
}

impl ConsoleSinkBuilder {
    fn for_target(target: ConsoleTarget) -> Self {
        Self {
            target,
            capacity: None,
            flush_timeout_ms: None,
            overflow_timeout_ms: None,
            formatter: SharedFormatter::default(),
        }
    }

    pub fn stdout() -> Self {
        Self::for_target(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::for_target(ConsoleTarget::Stderr)
    }

    option_setter!(
        #[doc = "Set the bounded channel capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_flush_timeout_ms, flush_timeout_ms, u64);
    option_setter!(
        #[doc = "Wait up to this many milliseconds for queue space instead of dropping at once."]
        with_overflow_timeout_ms,
        overflow_timeout_ms,
        u64
    );

    pub fn with_formatter(mut self, formatter: SharedFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    fn build_config(&self) -> Result<ConsoleSinkConfig, SinkBuildError> {
        let mut config = ConsoleSinkConfig::default();
        if let Some(capacity) = self.capacity {
            config = config.with_capacity(ensure_positive!(capacity, "capacity")?);
        }
        if let Some(timeout) = self.flush_timeout_ms {
            let timeout = ensure_positive!(timeout, "flush_timeout_ms")?;
            config = config.with_flush_timeout(Duration::from_millis(timeout));
        }
        if let Some(timeout) = self.overflow_timeout_ms {
            let timeout = ensure_positive!(timeout, "overflow_timeout_ms")?;
            config = config.with_overflow(OverflowPolicy::Timeout(Duration::from_millis(timeout)));
        }
        Ok(config)
    }

    pub fn build(&self) -> Result<ConsoleSink, SinkBuildError> {
        let config = self.build_config()?;
        let formatter = self.formatter.clone();
        Ok(match self.target {
            ConsoleTarget::Stdout => ConsoleSink::with_config(std::io::stdout(), formatter, config),
            ConsoleTarget::Stderr => ConsoleSink::with_config(std::io::stderr(), formatter, config),
        })
    }
}

impl SinkBuilderTrait for ConsoleSinkBuilder {
    fn build_sink(&self) -> Result<Arc<dyn LogSink>, SinkBuildError> {
        Ok(Arc::new(self.build()?))
    }
}
