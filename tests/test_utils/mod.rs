pub mod fixtures;
pub mod shared_buffer;

pub use shared_buffer::SharedBuf;
