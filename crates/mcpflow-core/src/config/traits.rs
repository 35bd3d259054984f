//! Settings store trait

use async_trait::async_trait;

use super::settings::Settings;
use crate::types::ServerDescriptor;

/// Where settings live
///
/// Implementations:
/// - `MemorySettingsStore`: In-memory for testing and embedding hosts
/// - `FileSettingsStore`: YAML file (~/.config/mcpflow/settings.yaml)
///
/// Server names are matched case-insensitively.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current settings (defaults when nothing is stored yet)
    async fn load(&self) -> ConfigResult<Settings>;

    /// Replace the stored settings
    async fn save(&self, settings: &Settings) -> ConfigResult<()>;

    async fn servers(&self) -> ConfigResult<Vec<ServerDescriptor>> {
        Ok(self.load().await?.mcp.servers)
    }

    async fn add_server(&self, server: ServerDescriptor) -> ConfigResult<()> {
        let mut settings = self.load().await?;
        insert_server(&mut settings, server)?;
        self.save(&settings).await
    }

    async fn update_server(&self, name: &str, server: ServerDescriptor) -> ConfigResult<()> {
        let mut settings = self.load().await?;
        replace_server(&mut settings, name, server)?;
        self.save(&settings).await
    }

    async fn remove_server(&self, name: &str) -> ConfigResult<()> {
        let mut settings = self.load().await?;
        delete_server(&mut settings, name)?;
        self.save(&settings).await
    }
}

fn position(settings: &Settings, name: &str) -> Option<usize> {
    let name_lower = name.to_lowercase();
    settings
        .mcp
        .servers
        .iter()
        .position(|s| s.name.to_lowercase() == name_lower)
}

pub(crate) fn insert_server(settings: &mut Settings, server: ServerDescriptor) -> ConfigResult<()> {
    if position(settings, &server.name).is_some() {
        return Err(ConfigError::ServerExists(server.name));
    }
    settings.mcp.servers.push(server);
    Ok(())
}

pub(crate) fn replace_server(settings: &mut Settings, name: &str, server: ServerDescriptor) -> ConfigResult<()> {
    let pos = position(settings, name).ok_or_else(|| ConfigError::ServerNotFound(name.to_string()))?;
    if !server.name.eq_ignore_ascii_case(name) && position(settings, &server.name).is_some() {
        return Err(ConfigError::ServerExists(server.name));
    }
    settings.mcp.servers[pos] = server;
    Ok(())
}

pub(crate) fn delete_server(settings: &mut Settings, name: &str) -> ConfigResult<()> {
    let pos = position(settings, name).ok_or_else(|| ConfigError::ServerNotFound(name.to_string()))?;
    settings.mcp.servers.remove(pos);
    Ok(())
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Server already exists: {0}")]
    ServerExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
