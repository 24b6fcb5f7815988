use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::repository::errors::RepositoryError;
use crate::usecase::contracts::{StoreKey, TokenStore};

/// Process-local store; the session is gone when the process exits.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<StoreKey, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StoreKey) -> Option<String> {
        self.entries().get(&key).cloned()
    }

    fn set(&self, key: StoreKey, value: &str) -> Result<(), RepositoryError> {
        self.entries().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), RepositoryError> {
        self.entries().remove(&key);
        Ok(())
    }

    fn clear(&self) -> Result<(), RepositoryError> {
        self.entries().clear();
        Ok(())
    }
}
