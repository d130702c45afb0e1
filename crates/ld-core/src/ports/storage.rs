use thiserror::Error;

/// Durable storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage is unavailable (missing directory, quota, platform refusal).
    #[error("durable storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded.
    #[error("durable storage data corrupt: {0}")]
    Corrupt(String),

    /// Other storage failures.
    #[error("durable storage failed: {0}")]
    Other(String),
}

/// Key-value port for small durable blobs that must survive a restart.
///
/// Read-modify-write sequences on top of this port are not atomic across
/// processes.
pub trait DurableStoragePort: Send + Sync {
    /// Read a value by key.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value by key, replacing any previous value.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value by key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

