//! Time-bounded cache of tool lists per server

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::pool::PoolKey;
use crate::types::{ServerDescriptor, ToolDescriptor};

/// Default time-to-live for cached tool lists
pub const DEFAULT_TOOL_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    stored_at: Instant,
    tools: Vec<ToolDescriptor>,
}

/// Tool lists keyed by server identity, consulted before asking a client
///
/// Independent of each client's own cache; entries past their TTL are
/// removed when read.
pub struct ToolCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for ToolCache {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_CACHE_TTL)
    }
}

impl ToolCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Cache built from the settings value in minutes
    pub fn from_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Cache key for a server: name plus the pool identity (endpoint and credential)
    pub fn key_for(server: &ServerDescriptor) -> String {
        format!("mcp:tools:{}:{}", server.name, PoolKey::for_server(server))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, server_id: &str) -> Option<Vec<ToolDescriptor>> {
        {
            let entries = self.entries.read();
            match entries.get(server_id) {
                None => return None,
                Some(entry) if entry.stored_at.elapsed() < self.ttl => return Some(entry.tools.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write();
        if entries
            .get(server_id)
            .is_some_and(|entry| entry.stored_at.elapsed() >= self.ttl)
        {
            entries.remove(server_id);
        }
        None
    }

    pub fn set(&self, server_id: impl Into<String>, tools: Vec<ToolDescriptor>) {
        self.entries.write().insert(
            server_id.into(),
            CacheEntry {
                stored_at: Instant::now(),
                tools,
            },
        );
    }

    pub fn invalidate(&self, server_id: &str) -> bool {
        self.entries.write().remove(server_id).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(names: &[&str]) -> Vec<ToolDescriptor> {
        names.iter().map(|n| ToolDescriptor::new(*n, "")).collect()
    }

    #[test]
    fn test_get_set_invalidate() {
        let cache = ToolCache::default();
        assert!(cache.get("a").is_none());

        cache.set("a", tools(&["search", "fetch"]));
        assert_eq!(cache.get("a").unwrap().len(), 2);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let cache = ToolCache::new(Duration::from_millis(10));
        cache.set("a", tools(&["search"]));
        std::thread::sleep(Duration::from_millis(25));

        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear_and_minutes() {
        let cache = ToolCache::from_minutes(5);
        assert_eq!(cache.ttl(), Duration::from_secs(300));

        cache.set("a", tools(&["x"]));
        cache.set("b", tools(&["y"]));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_key_includes_endpoint_and_credential() {
        let a = ServerDescriptor::new("docs", "http://one/mcp").with_api_key("k1");
        let b = ServerDescriptor::new("docs", "http://two/mcp").with_api_key("k1");
        let rotated = ServerDescriptor::new("docs", "http://one/mcp").with_api_key("k2");
        assert_ne!(ToolCache::key_for(&a), ToolCache::key_for(&b));
        assert_ne!(ToolCache::key_for(&a), ToolCache::key_for(&rotated));
        assert_eq!(ToolCache::key_for(&a), ToolCache::key_for(&a.clone()));
        assert!(ToolCache::key_for(&a).starts_with("mcp:tools:docs:"));
        assert!(!ToolCache::key_for(&a).contains("k1"));
    }
}
