//! File-based settings store (YAML)
//!
//! The user-level file lives at `~/.config/mcpflow/settings.yaml` (platform
//! config directory); any other path can be given explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::Settings;
use super::traits::{ConfigResult, SettingsStore};

/// YAML settings file with an in-memory cache
///
/// # Example
///
/// ```no_run
/// use mcpflow_core::config::FileSettingsStore;
///
/// let store = FileSettingsStore::user();
/// println!("settings at {}", store.path().display());
/// ```
pub struct FileSettingsStore {
    path: PathBuf,
    cache: RwLock<Option<Settings>>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// User-level settings file
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("mcpflow").join("settings.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_file(&self) -> ConfigResult<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    fn write_file(&self, settings: &Settings) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(settings)?;
        fs::write(&self.path, content)?;
        *self.cache.write() = Some(settings.clone());
        Ok(())
    }

    fn cached(&self) -> ConfigResult<Settings> {
        if let Some(settings) = self.cache.read().as_ref() {
            return Ok(settings.clone());
        }
        self.reload()
    }

    /// Re-read the file, replacing the cache
    pub fn reload(&self) -> ConfigResult<Settings> {
        let settings = self.read_file()?;
        *self.cache.write() = Some(settings.clone());
        Ok(settings)
    }

    /// Copy the current file next to itself with a `.backup` suffix
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileSettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSettingsStore")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> ConfigResult<Settings> {
        self.cached()
    }

    async fn save(&self, settings: &Settings) -> ConfigResult<()> {
        self.write_file(settings)
    }
}
