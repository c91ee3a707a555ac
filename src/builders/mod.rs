//! Sink builders and associated traits.
//!
//! Builders collect optional settings, validate them, and only then spawn
//! the sink's worker. Each builder implements [`SinkBuilderTrait`] so a
//! caller can build and register a sink without naming its concrete type.

use std::{io, sync::Arc};

use thiserror::Error;

use crate::sink::LogSink;

pub mod console_builder;
pub mod stream_builder;

pub use console_builder::ConsoleSinkBuilder;
pub use stream_builder::StreamSinkBuilder;

/// Errors that may occur while building a sink.
#[derive(Debug, Error)]
pub enum SinkBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid sink configuration: {0}")]
    InvalidConfig(String),
    /// The sink's worker thread could not be started.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Trait implemented by all sink builders.
pub trait SinkBuilderTrait: Send + Sync {
    fn build_sink(&self) -> Result<Arc<dyn LogSink>, SinkBuildError>;
}

/// Validate that a value is greater than zero, returning an error otherwise.
macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err($crate::builders::SinkBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

pub(crate) use ensure_positive;

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

pub(crate) use option_setter;
