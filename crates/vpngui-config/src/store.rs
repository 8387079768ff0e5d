// ── File-backed collaborator store ──
//
// Serves the persisted `[state]` flags and `[settings]` to the
// orchestrator. Reads come from an in-memory copy; `reload()` and
// `save()` move it to and from disk explicitly.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use vpngui_core::{BackendResult, ConfigStore, SettingsStore};

use crate::{Config, ConfigError, config_path, load_from, save_to};

pub struct FileStore {
    path: PathBuf,
    config: RwLock<Config>,
}

impl FileStore {
    /// Load the store from `path`. A missing file starts from defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = load_from(&path)?;
        debug!(path = %path.display(), "config loaded");
        Ok(Self {
            path,
            config: RwLock::new(config),
        })
    }

    /// Open the store at the platform config path.
    pub fn open_default() -> Result<Self, ConfigError> {
        Self::open(config_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current in-memory config.
    pub fn snapshot(&self) -> Config {
        self.read().clone()
    }

    /// Edit the in-memory config. Call [`save`](Self::save) to persist.
    pub fn update(&self, f: impl FnOnce(&mut Config)) {
        let mut guard = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }

    /// Re-read the file, replacing unsaved edits.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let fresh = load_from(&self.path)?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        debug!(path = %self.path.display(), "config reloaded");
        Ok(())
    }

    /// Validate and write the in-memory config to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let cfg = self.snapshot();
        save_to(&cfg, &self.path)?;
        info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConfigStore for FileStore {
    async fn active_flag(&self) -> BackendResult<bool> {
        Ok(self.read().state.active_vpn)
    }

    async fn route_enforcement_flag(&self) -> BackendResult<bool> {
        Ok(self.read().state.blacklist_enforced)
    }

    async fn routes_disabled_flag(&self) -> BackendResult<bool> {
        Ok(self.read().state.disable_routes)
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn poll_interval_seconds(&self) -> BackendResult<i64> {
        Ok(self.read().settings.stats_update_interval)
    }
}
