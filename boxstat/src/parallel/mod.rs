//! Worker pools and thread-local accumulate-then-reduce storage

mod index_range;
mod pool;
mod thread_storage;

pub use index_range::*;
pub use pool::*;
pub use thread_storage::*;
