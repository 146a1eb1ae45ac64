//! Storage and collaborator adapters: in-memory implementations for tests
//! and the CLI driver, plus an optional persistent RocksDB backend.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
