//! Helpers shared by unit and integration tests.
//!
//! Compiled for the crate's own tests and, through the `test-util`
//! feature, for the integration tests under `tests/`.

mod collecting_sink;

pub use collecting_sink::CollectingSink;
