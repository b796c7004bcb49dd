mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

#[cfg(test)]
pub(crate) use memory_store::FailingStore;
