//! Newline-delimited JSON framing.

use thiserror::Error;

use crate::{formatter::SharedFormatter, log_record::LogRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

/// Encode `record` as one JSON line terminated by `\n`.
///
/// A record the formatter cannot encode is replaced by the minimal fallback
/// line. Frames larger than `max_size` bytes are rejected.
pub fn encode_frame(
    formatter: &SharedFormatter,
    record: &LogRecord,
    max_size: usize,
) -> Result<Vec<u8>, FrameError> {
    let line = formatter.format_or_fallback(record);
    let size = line.len() + 1;
    if size > max_size {
        return Err(FrameError::TooLarge {
            size,
            limit: max_size,
        });
    }
    let mut frame = Vec::with_capacity(size);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    Ok(frame)
}
