use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use ld_core::ports::{DurableStoragePort, StorageError};

/// Process-local storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemoryDurableStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryDurableStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DurableStoragePort for InMemoryDurableStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}
