//! Registry store backends.

mod file_store;
mod memory_store;
mod pg_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
