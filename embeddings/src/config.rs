use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The configuration of an `EmbeddingStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The size of the embedding vectors.
    pub size: usize,
    /// Whether the encoder substitutes missing words with the zero embedding.
    #[serde(default)]
    pub use_zero_embedding: bool,
    /// The directory of the backing store.
    pub db_path: PathBuf,
    /// Embeddings can't be set and aren't trained.
    #[serde(default)]
    pub read_only: bool,
    /// Start from an empty backing store, discarding any existing one.
    #[serde(default)]
    pub force_new_db: bool,
}

impl Config {
    /// The configuration of the backing store.
    pub fn db_config(&self) -> kvdb::Config {
        kvdb::Config::new(&self.db_path)
            .read_only(self.read_only)
            .force_new(self.force_new_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json() {
        let json = r#"{ "size": 300, "db_path": "vectors", "read_only": true }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.size, 300);
        assert!(!config.use_zero_embedding);
        assert!(!config.force_new_db);

        let db = config.db_config();
        assert_eq!(db.path, PathBuf::from("vectors"));
        assert!(db.read_only);
    }
}
