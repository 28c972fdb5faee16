use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Engine-level options a caller can set when opening a store (spec §6).
///
/// This is deliberately small — the engine doesn't know about relay policy,
/// write/read permissions, or rate limiting; those live one layer up, outside
/// this crate's scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Directory holding the LMDB environment files.
    pub data_dir: String,
    /// LMDB map size devoted to the block cache, in bytes.
    #[serde(default = "default_block_cache_size")]
    pub block_cache_size: usize,
    /// Run a compacting close on shutdown.
    #[serde(default = "default_compact_on_close")]
    pub compact_on_close: bool,
}

fn default_block_cache_size() -> usize {
    1024 * 1024 * 1024 // 1 GiB
}

fn default_compact_on_close() -> bool {
    true
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            block_cache_size: default_block_cache_size(),
            compact_on_close: default_compact_on_close(),
        }
    }
}

impl StoreOptions {
    /// Load options from a TOML file, the way an embedding relay's own
    /// config loads `moar::config::MoarConfig` in `main.rs`.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_a_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eventdex.toml");
        std::fs::write(&path, "data_dir = \"/tmp/eventdex-data\"\n").unwrap();

        let options = StoreOptions::from_toml_file(&path).unwrap();
        assert_eq!(options.data_dir, "/tmp/eventdex-data");
        assert_eq!(options.block_cache_size, default_block_cache_size());
        assert!(options.compact_on_close);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = StoreOptions::from_toml_file("/nonexistent/eventdex.toml").unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
