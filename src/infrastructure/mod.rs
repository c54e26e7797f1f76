pub mod in_memory;
pub mod lock;
pub mod notify;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
