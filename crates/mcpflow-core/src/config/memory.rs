//! In-memory settings store

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::Settings;
use super::traits::{ConfigResult, SettingsStore};

/// Settings held in memory, for tests and hosts that own persistence
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Mutate the stored settings in place
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        f(&mut self.settings.write());
    }

    /// Snapshot without going through the async trait
    pub fn snapshot(&self) -> Settings {
        self.settings.read().clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> ConfigResult<Settings> {
        Ok(self.snapshot())
    }

    async fn save(&self, settings: &Settings) -> ConfigResult<()> {
        *self.settings.write() = settings.clone();
        Ok(())
    }
}
