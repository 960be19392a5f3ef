//! PDF Viewer Cache Library
//!
//! Bounded working-set tracking for rendered pages with LRU eviction.

pub mod view_buffer;

pub use view_buffer::{BufferStats, ViewBuffer, DEFAULT_CACHE_SIZE};
