use std::collections::HashMap;

use log::warn;
use parking_lot::RwLock;

use crate::{KeyValueDb, KvErr, Result};

/// A `KeyValueDb` that only lives in memory.
#[derive(Debug)]
pub struct MemoryDb {
    entries: RwLock<Option<HashMap<Vec<u8>, Vec<u8>>>>,
    read_only: bool,
}

impl Default for MemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDb {
    /// Creates a new empty writable `MemoryDb`.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Some(HashMap::new())),
            read_only: false,
        }
    }

    /// Makes the store reject every `put` from now on.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

fn closed() -> KvErr {
    warn!("use of a closed memory store");
    KvErr::Closed
}

impl KeyValueDb for MemoryDb {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write();
        let entries = entries.as_mut().ok_or_else(closed)?;

        if self.read_only {
            return Err(KvErr::ReadOnly);
        }

        entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read();
        let entries = entries.as_ref().ok_or_else(closed)?;
        Ok(entries.get(key).cloned())
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let entries = self.entries.read();
        let entries = entries.as_ref().ok_or_else(closed)?;
        Ok(entries.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        let entries = self.entries.read();
        let entries = entries.as_ref().ok_or_else(closed)?;
        Ok(entries.len())
    }

    fn close(&self) -> Result<()> {
        self.entries.write().take();
        Ok(())
    }
}
