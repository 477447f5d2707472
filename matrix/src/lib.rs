//! Dense row-major matrices of `f32` backed by a process-wide buffer pool.
//!
//! Every value flowing through the autodiff engine is a [`Matrix`]. Buffers are
//! taken from and given back to the pool explicitly, see [`Matrix::zeros`] and
//! [`Matrix::release`].

mod codec;
mod dense;
mod error;
mod pool;

pub use dense::{Float, Matrix};
pub use error::{MatErr, Result};
pub use pool::{PoolStats, pool_stats, purge_pool};
