use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The configuration of a file backed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The directory holding the store data, created if missing.
    pub path: PathBuf,
    /// Open without write access, `put` is rejected.
    #[serde(default)]
    pub read_only: bool,
    /// Discard any existing data on open.
    #[serde(default)]
    pub force_new: bool,
}

impl Config {
    /// Creates a new read-write `Config` keeping existing data.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
            force_new: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }
}
