use std::{collections::HashMap, sync::Arc};

use kvdb::KeyValueDb;
use log::{debug, info, warn};
use matrix::Matrix;
use parameters::{Param, ParamsType, Payload};
use parking_lot::Mutex;

use crate::{Config, EmbErr, Result};

#[derive(Debug, Default)]
struct WorkingSet {
    used: HashMap<String, Arc<Param>>,
    closed: bool,
}

/// A word to vector map that lives in a key/value store.
///
/// Embeddings are only materialized as parameters when looked up, and stay in a working set
/// until `clear_used_embeddings` is called. Materialized parameters write every change back
/// to the store, so they can be trained in place.
pub struct EmbeddingStore {
    config: Config,
    storage: Arc<dyn KeyValueDb>,
    working_set: Mutex<WorkingSet>,
    zero_embedding: Arc<Param>,
}

impl EmbeddingStore {
    /// Opens the file backed store described by `config`.
    ///
    /// # Returns
    /// The new store or a `Storage` error if the backing store can't be opened.
    pub fn open(config: Config) -> Result<Self> {
        let storage = kvdb::open(&config.db_config())?;
        Ok(Self::with_db(config, storage))
    }

    /// Creates a new store on top of an already opened backing store.
    ///
    /// # Arguments
    /// * `config` - The store configuration, its database options are ignored.
    /// * `storage` - The backing store.
    pub fn with_db(config: Config, storage: Arc<dyn KeyValueDb>) -> Self {
        let zero_embedding = Param::new(Matrix::zeros(config.size, 1))
            .with_type(ParamsType::Weights)
            .with_requires_grad(false);

        info!(
            size = config.size,
            read_only = config.read_only;
            "embedding store ready"
        );

        Self {
            config,
            storage,
            working_set: Mutex::new(WorkingSet::default()),
            zero_embedding: Arc::new(zero_embedding),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared `size x 1` zero vector, it never requires gradients.
    pub fn zero_embedding(&self) -> Arc<Param> {
        Arc::clone(&self.zero_embedding)
    }

    /// Stores `value` as the embedding of `word`, replacing the previous one.
    ///
    /// The stored embedding has an empty payload. A materialized copy of the previous
    /// embedding is dropped from the working set.
    ///
    /// # Returns
    /// `ReadOnly` in read-only mode, `Closed` after `close` or a storage error.
    pub fn set_embedding(&self, word: &str, value: Matrix) -> Result<()> {
        if self.config.read_only {
            return Err(EmbErr::ReadOnly);
        }

        let mut working_set = self.lock()?;

        let embedding = Param::new(value);
        embedding.set_payload(Payload::default())?;
        self.storage.put(word.as_bytes(), &embedding.to_bytes()?)?;

        // a stale copy must not write its old value through anymore
        if let Some(stale) = working_set.used.remove(word) {
            stale.release();
        }
        Ok(())
    }

    /// Looks up the embedding of `word`, falling back to its lower case form.
    ///
    /// Found embeddings are materialized once and kept in the working set, later lookups of
    /// the same word return the same parameter.
    ///
    /// # Returns
    /// The embedding, `None` if neither form is stored, or an error if the store is closed or
    /// its contents can't be read.
    pub fn get_embedding(&self, word: &str) -> Result<Option<Arc<Param>>> {
        let mut working_set = self.lock()?;

        if let Some(found) = self.lookup(&mut working_set, word)? {
            return Ok(Some(found));
        }

        let lower = word.to_lowercase();
        if lower == word {
            return Ok(None);
        }

        self.lookup(&mut working_set, &lower)
    }

    /// Returns every materialized embedding.
    pub fn used_embeddings(&self) -> Vec<Arc<Param>> {
        self.working_set.lock().used.values().cloned().collect()
    }

    /// Returns the amount of embeddings in the backing store.
    pub fn count(&self) -> Result<usize> {
        let _working_set = self.lock()?;
        Ok(self.storage.len()?)
    }

    /// Releases every materialized embedding and empties the working set.
    ///
    /// The backing store isn't touched. Parameters previously returned by `get_embedding`
    /// are left empty and must not be used anymore.
    pub fn clear_used_embeddings(&self) {
        let mut working_set = self.working_set.lock();
        release_all(&mut working_set.used);
    }

    /// Closes the backing store and clears the working set.
    ///
    /// Every later call fails with `Closed`, closing twice is not an error.
    pub fn close(&self) -> Result<()> {
        let mut working_set = self.working_set.lock();
        if working_set.closed {
            return Ok(());
        }

        working_set.closed = true;
        release_all(&mut working_set.used);
        self.storage.close()?;

        info!("embedding store closed");
        Ok(())
    }

    fn lock(&self) -> Result<parking_lot::MutexGuard<'_, WorkingSet>> {
        let working_set = self.working_set.lock();
        if working_set.closed {
            warn!("use of a closed embedding store");
            return Err(EmbErr::Closed);
        }

        Ok(working_set)
    }

    /// Finds `word` exactly, in the working set first and then in the backing store.
    fn lookup(&self, working_set: &mut WorkingSet, word: &str) -> Result<Option<Arc<Param>>> {
        if let Some(found) = working_set.used.get(word) {
            return Ok(Some(Arc::clone(found)));
        }

        let Some(bytes) = self.storage.get(word.as_bytes())? else {
            return Ok(None);
        };

        let embedding = Param::from_bytes(&bytes)?
            .with_name(word)
            .with_type(ParamsType::Weights)
            .with_requires_grad(!self.config.read_only)
            .with_storage(Arc::clone(&self.storage));

        let embedding = Arc::new(embedding);
        working_set.used.insert(word.to_string(), Arc::clone(&embedding));

        debug!(used = working_set.used.len(); "materialized embedding {word:?}");
        Ok(Some(embedding))
    }
}

fn release_all(used: &mut HashMap<String, Arc<Param>>) {
    let released = used.len();
    used.drain().for_each(|(_, param)| param.release());
    debug!(released = released; "cleared used embeddings");
}
