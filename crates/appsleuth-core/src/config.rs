//! Engine configuration, persisted as JSON.
//!
//! A missing file yields defaults; a present but malformed file is an
//! error rather than being silently replaced.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "appsleuth.json";
pub const DATA_ROOT_ENV: &str = "APPSLEUTH_DATA_ROOT";
pub const DEFAULT_SYNC_WORKERS: usize = 5;
pub const MAX_SYNC_WORKERS: usize = 32;

const ICON_DIR_NAME: &str = "icons";
const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory the engine owns; icons live in `<data_root>/icons`.
    pub data_root: PathBuf,
    /// Roots to scan. Empty means the OS default locations.
    pub scan_roots: Vec<String>,
    pub sync_workers: usize,
    pub progress_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            scan_roots: Vec::new(),
            sync_workers: DEFAULT_SYNC_WORKERS,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Load from `path`, or from [`default_config_path`] when `None`.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(CoreError::io("reading config", &path, e)),
        };
        serde_json::from_str(&raw)
            .map_err(|e| CoreError::InvalidInput(format!("config {}: {e}", path.display())))
    }

    pub fn from_json(raw: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| CoreError::InvalidInput(format!("config: {e}")))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::io("creating config directory", parent, e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Failed(format!("serialising config: {e}")))?;
        std::fs::write(path, json).map_err(|e| CoreError::io("writing config", path, e))
    }

    pub fn icon_cache_dir(&self) -> PathBuf {
        self.data_root.join(ICON_DIR_NAME)
    }

    /// Worker count clamped to `1..=MAX_SYNC_WORKERS`.
    pub fn worker_count(&self) -> usize {
        self.sync_workers.clamp(1, MAX_SYNC_WORKERS)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

/// `<config dir>/AppSleuth/appsleuth.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("AppSleuth").join(CONFIG_FILE_NAME))
}

/// `APPSLEUTH_DATA_ROOT`, else the platform's local data directory, else
/// the temp directory.
pub fn default_data_root() -> PathBuf {
    if let Some(root) = std::env::var_os(DATA_ROOT_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::data_local_dir()
        .map(|d| d.join("AppSleuth"))
        .unwrap_or_else(|| std::env::temp_dir().join("appsleuth"))
}
