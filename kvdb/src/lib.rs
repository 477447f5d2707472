//! Byte-oriented key/value stores used to keep parameters out of core.

mod config;
mod error;
mod file;
mod memory;

use std::sync::Arc;

pub use config::Config;
pub use error::{KvErr, Result};
pub use file::FileDb;
pub use memory::MemoryDb;

/// A persistent mapping from byte keys to byte values.
///
/// Implementors are shared between threads, every method takes `&self`. Once `close` has been
/// called every other method fails with `KvErr::Closed`.
pub trait KeyValueDb: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Returns
    /// `KvErr::ReadOnly` if the store was opened read-only.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetches the value stored under `key`, `None` if there's none.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Returns every stored key, in no particular order.
    fn keys(&self) -> Result<Vec<Vec<u8>>>;

    /// Returns the amount of stored keys.
    fn len(&self) -> Result<usize> {
        Ok(self.keys()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Flushes and closes the store. Closing twice is not an error.
    fn close(&self) -> Result<()>;
}

/// Opens the file backed store described by `config`.
///
/// # Arguments
/// * `config` - The store configuration.
///
/// # Returns
/// The opened store or an error if the configuration is invalid or the store can't be read.
pub fn open(config: &Config) -> Result<Arc<dyn KeyValueDb>> {
    let db = FileDb::open(config)?;
    Ok(Arc::new(db))
}
