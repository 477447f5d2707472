//! Word embeddings kept in a key/value store and loaded on demand.

mod config;
mod encoder;
mod error;
mod registry;
mod store;

pub use config::Config;
pub use encoder::Encoder;
pub use error::{EmbErr, Result};
pub use registry::Registry;
pub use store::EmbeddingStore;
