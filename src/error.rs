use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistrationError>;

#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Startup misconfiguration (e.g. no default calculator). Not recoverable per-request.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Storage read error: {0}")]
    StorageRead(String),
    #[error("Storage write error: {0}")]
    StorageWrite(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}
