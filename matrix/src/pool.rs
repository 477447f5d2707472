use std::{
    collections::HashMap,
    sync::{
        LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

use log::debug;
use parking_lot::Mutex;

use crate::Float;

/// The maximum amount of idle buffers kept for a single element count.
const MAX_CACHED_PER_SIZE: usize = 64;

static POOL: LazyLock<BufferPool> = LazyLock::new(BufferPool::new);

/// Snapshot of the pool's allocation statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of idle buffers currently held by the pool.
    pub cached_buffers: usize,
    /// Total number of elements held by those buffers.
    pub cached_elems: usize,
    /// Acquisitions served from the pool.
    pub hits: u64,
    /// Acquisitions that fell through to a fresh allocation.
    pub misses: u64,
}

/// Free lists of numeric buffers keyed by element count.
struct BufferPool {
    buckets: Mutex<HashMap<usize, Vec<Vec<Float>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BufferPool {
    fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Takes a zeroed buffer of `len` elements, reusing an idle one if possible.
    fn acquire(&self, len: usize) -> Vec<Float> {
        let cached = self.buckets.lock().get_mut(&len).and_then(Vec::pop);

        match cached {
            Some(mut buf) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                buf.fill(0.);
                buf
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                vec![0.; len]
            }
        }
    }

    /// Gives `buf` back, the pool silently drops it when its bucket is full.
    fn release(&self, buf: Vec<Float>) {
        let len = buf.len();
        if len == 0 {
            return;
        }

        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(len).or_default();

        if bucket.len() < MAX_CACHED_PER_SIZE {
            bucket.push(buf);
        }
    }

    fn stats(&self) -> PoolStats {
        let buckets = self.buckets.lock();
        let (cached_buffers, cached_elems) = buckets
            .iter()
            .fold((0, 0), |(n, elems), (len, bucket)| {
                (n + bucket.len(), elems + len * bucket.len())
            });

        PoolStats {
            cached_buffers,
            cached_elems,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn purge(&self) {
        let mut buckets = self.buckets.lock();
        let freed: usize = buckets.values().map(Vec::len).sum();
        buckets.clear();
        debug!(freed = freed; "purged buffer pool");
    }
}

pub(crate) fn acquire(len: usize) -> Vec<Float> {
    POOL.acquire(len)
}

pub(crate) fn release(buf: Vec<Float>) {
    POOL.release(buf);
}

/// Returns the current statistics of the process-wide buffer pool.
pub fn pool_stats() -> PoolStats {
    POOL.stats()
}

/// Drops every idle buffer held by the process-wide pool.
pub fn purge_pool() {
    POOL.purge();
}
