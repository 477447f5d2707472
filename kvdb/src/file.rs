use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{BufReader, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::{Config, KeyValueDb, KvErr, Result};

/// The name of the log file inside the store directory.
const LOG_FILE: &str = "data.log";

/// `key_len: u32 LE` followed by `value_len: u64 LE`.
const HEADER_SIZE: usize = size_of::<u32>() + size_of::<u64>();

/// Where a value lives inside the log.
#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    len: u64,
}

#[derive(Debug)]
struct Inner {
    file: File,
    index: HashMap<Vec<u8>, Slot>,
    end: u64,
}

/// A `KeyValueDb` persisted as an append-only log of records inside a directory.
///
/// Every record is `[key_len u32 LE][value_len u64 LE][key][value]`. The whole log is scanned
/// on open to build an in-memory index of the latest record of each key, so a later record
/// for the same key wins. Old records are never compacted.
#[derive(Debug)]
pub struct FileDb {
    path: PathBuf,
    read_only: bool,
    inner: Mutex<Option<Inner>>,
}

impl FileDb {
    /// Opens (or creates) the store described by `config`.
    ///
    /// # Arguments
    /// * `config` - The store configuration.
    ///
    /// # Returns
    /// The opened store, `InvalidConfig` when asked to discard data of a read-only store,
    /// `Corrupted` if the log ends in a torn record or an io error.
    pub fn open(config: &Config) -> Result<Self> {
        let Config {
            path,
            read_only,
            force_new,
        } = config;

        if *read_only && *force_new {
            return Err(KvErr::InvalidConfig(
                "a read-only store can't be recreated".to_string(),
            ));
        }

        if *force_new && path.exists() {
            debug!("discarding existing store at {}", path.display());
            fs::remove_dir_all(path)?;
        }

        if !*read_only {
            fs::create_dir_all(path)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(!*read_only)
            .create(!*read_only)
            .open(path.join(LOG_FILE))?;

        let (index, end) = scan(&mut file).inspect_err(|e| {
            error!("failed to load store at {}: {e}", path.display());
        })?;

        info!(keys = index.len(), read_only = *read_only; "opened store at {}", path.display());

        Ok(Self {
            path: path.clone(),
            read_only: *read_only,
            inner: Mutex::new(Some(Inner { file, index, end })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn closed(&self) -> KvErr {
        warn!("use of a closed store at {}", self.path.display());
        KvErr::Closed
    }
}

impl KeyValueDb for FileDb {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = guard.as_mut().ok_or_else(|| self.closed())?;

        if self.read_only {
            return Err(KvErr::ReadOnly);
        }

        let key_len = u32::try_from(key.len())
            .map_err(|_| KvErr::InvalidConfig(format!("key of {} bytes is too long", key.len())))?;

        let mut record = Vec::with_capacity(HEADER_SIZE + key.len() + value.len());
        record.extend_from_slice(&key_len.to_le_bytes());
        record.extend_from_slice(&(value.len() as u64).to_le_bytes());
        record.extend_from_slice(key);
        record.extend_from_slice(value);

        // A failed append may leave a partial record behind, so the store stops serving
        // requests and has to be reopened.
        if let Err(e) = inner.file.write_all(&record) {
            error!("failed to append to store at {}, closing it: {e}", self.path.display());
            *guard = None;
            return Err(e.into());
        }

        let slot = Slot {
            offset: inner.end + (HEADER_SIZE + key.len()) as u64,
            len: value.len() as u64,
        };

        inner.index.insert(key.to_vec(), slot);
        inner.end += record.len() as u64;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let inner = inner.as_mut().ok_or_else(|| self.closed())?;

        let Some(&Slot { offset, len }) = inner.index.get(key) else {
            return Ok(None);
        };

        let mut value = vec![0; len as usize];
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.read_exact(&mut value)?;
        Ok(Some(value))
    }

    fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let inner = self.inner.lock();
        let inner = inner.as_ref().ok_or_else(|| self.closed())?;
        Ok(inner.index.keys().cloned().collect())
    }

    fn len(&self) -> Result<usize> {
        let inner = self.inner.lock();
        let inner = inner.as_ref().ok_or_else(|| self.closed())?;
        Ok(inner.index.len())
    }

    fn close(&self) -> Result<()> {
        let Some(inner) = self.inner.lock().take() else {
            return Ok(());
        };

        if !self.read_only {
            inner.file.sync_all()?;
        }

        info!(keys = inner.index.len(); "closed store at {}", self.path.display());
        Ok(())
    }
}

/// Reads every record of the log, returning the index and the offset right after the last one.
fn scan(file: &mut File) -> Result<(HashMap<Vec<u8>, Slot>, u64)> {
    let total = file.metadata()?.len();
    file.seek(SeekFrom::Start(0))?;

    let mut reader = BufReader::new(file);
    let mut index = HashMap::new();
    let mut offset = 0;

    while offset < total {
        let torn = || KvErr::Corrupted(format!("torn record at offset {offset}"));

        if total - offset < HEADER_SIZE as u64 {
            return Err(torn());
        }

        let mut header = [0; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let mut key_len = [0; size_of::<u32>()];
        let mut value_len = [0; size_of::<u64>()];
        key_len.copy_from_slice(&header[..size_of::<u32>()]);
        value_len.copy_from_slice(&header[size_of::<u32>()..]);

        let key_len = u32::from_le_bytes(key_len) as u64;
        let value_len = u64::from_le_bytes(value_len);

        let record_len = (HEADER_SIZE as u64)
            .checked_add(key_len)
            .and_then(|n| n.checked_add(value_len))
            .filter(|&n| n <= total - offset)
            .ok_or_else(torn)?;

        let mut key = vec![0; key_len as usize];
        reader.read_exact(&mut key)?;
        reader.seek_relative(value_len as i64)?;

        let slot = Slot {
            offset: offset + HEADER_SIZE as u64 + key_len,
            len: value_len,
        };

        index.insert(key, slot);
        offset += record_len;
    }

    Ok((index, offset))
}
