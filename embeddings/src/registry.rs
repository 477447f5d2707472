use std::sync::Arc;

use log::error;
use parking_lot::Mutex;

use crate::{Config, EmbeddingStore, Result};

/// Keeps track of every embedding store opened by an application.
#[derive(Default)]
pub struct Registry {
    stores: Mutex<Vec<Arc<EmbeddingStore>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new file backed store and registers it.
    pub fn open(&self, config: Config) -> Result<Arc<EmbeddingStore>> {
        let store = Arc::new(EmbeddingStore::open(config)?);
        self.register(Arc::clone(&store));
        Ok(store)
    }

    pub fn register(&self, store: Arc<EmbeddingStore>) {
        self.stores.lock().push(store);
    }

    pub fn len(&self) -> usize {
        self.stores.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.lock().is_empty()
    }

    /// Clears the working set of every registered store.
    pub fn clear_used_embeddings(&self) {
        self.stores
            .lock()
            .iter()
            .for_each(|store| store.clear_used_embeddings());
    }

    /// Closes every registered store.
    ///
    /// # Returns
    /// The first error found, every store is closed regardless.
    pub fn close(&self) -> Result<()> {
        let mut res = Ok(());

        for store in self.stores.lock().iter() {
            if let Err(e) = store.close() {
                error!("failed to close embedding store: {e}");
                if res.is_ok() {
                    res = Err(e);
                }
            }
        }

        res
    }
}
