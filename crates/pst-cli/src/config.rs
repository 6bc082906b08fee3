use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pst_engine::EngineConfig;
use pst_store::{SyncMode, WalConfig};
use serde::{Deserialize, Serialize};

/// Name of the settings file inside a data directory.
pub const CONFIG_FILE_NAME: &str = "pstore.toml";

/// Settings read from `pstore.toml` in the data directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Largest accepted chunk payload in bytes. Unlimited when absent.
    pub max_chunk_bytes: Option<usize>,
    /// `fsync` the write-ahead log after every committed call.
    pub sync_every_write: bool,
    /// Log filter used when `PSTORE_LOG` is unset.
    pub log_filter: String,
    /// Reservation registry file, relative to the data directory.
    pub registry_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: None,
            sync_every_write: true,
            log_filter: "info".into(),
            registry_file: "registry.json".into(),
        }
    }
}

impl StoreConfig {
    /// Load settings from `data_dir`, falling back to defaults when the
    /// file does not exist.
    pub fn load(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_chunk_bytes: self.max_chunk_bytes,
        }
    }

    pub fn wal_config(&self) -> WalConfig {
        WalConfig {
            sync_mode: if self.sync_every_write {
                SyncMode::EveryWrite
            } else {
                SyncMode::OsDefault
            },
        }
    }

    pub fn registry_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.registry_file)
    }
}
