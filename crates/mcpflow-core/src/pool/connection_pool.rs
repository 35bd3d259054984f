//! Pool of live tool server connections

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::logging::SharedLogger;
use crate::mcp::{ClientFactory, McpError, McpResult, ToolClient};
use crate::retry::{RetryContext, RetryPolicy};
use crate::types::{CancellationToken, ServerDescriptor};

/// Identity of a pooled connection: endpoint plus credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolKey(u64);

impl PoolKey {
    pub fn for_server(server: &ServerDescriptor) -> Self {
        let mut hasher = DefaultHasher::new();
        server.url.trim().hash(&mut hasher);
        server.api_key.trim().hash(&mut hasher);
        PoolKey(hasher.finish())
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Pool timing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Unused connections older than this are swept
    pub idle_timeout: Duration,
    /// A connection unused for longer than this counts as idle
    pub idle_grace: Duration,
    /// How often the background sweep runs
    pub sweep_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5 * 60),
            idle_grace: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Snapshot of pool usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatistics {
    pub total: usize,
    pub active: usize,
    pub idle: usize,
    pub total_uses: u64,
}

/// One client plus usage metadata
pub struct PooledConnection {
    client: Arc<dyn ToolClient>,
    created_at: Instant,
    last_used: Mutex<Instant>,
    use_count: AtomicU64,
    /// Set once the handshake succeeded; concurrent callers wait on it
    ready: OnceCell<()>,
    failed: AtomicBool,
    /// Callers currently inside `ensure_connected`
    waiters: AtomicUsize,
}

/// Counts a caller waiting on a pooled handshake, even if its future is dropped
struct Waiter<'a>(&'a AtomicUsize);

impl<'a> Waiter<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Waiter(count)
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PooledConnection {
    fn new(client: Arc<dyn ToolClient>) -> Self {
        let now = Instant::now();
        Self {
            client,
            created_at: now,
            last_used: Mutex::new(now),
            use_count: AtomicU64::new(0),
            ready: OnceCell::new(),
            failed: AtomicBool::new(false),
            waiters: AtomicUsize::new(0),
        }
    }

    pub fn client(&self) -> &Arc<dyn ToolClient> {
        &self.client
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }

    pub fn use_count(&self) -> u64 {
        self.use_count.load(Ordering::SeqCst)
    }

    /// Connected and usable
    pub fn is_valid(&self) -> bool {
        self.client.is_connected()
    }

    /// Unused for longer than `grace`
    pub fn is_idle(&self, grace: Duration) -> bool {
        self.last_used().elapsed() > grace
    }

    /// Handshake finished but the client has since dropped its connection
    fn is_stale(&self) -> bool {
        self.ready.initialized() && !self.is_valid()
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
        self.use_count.fetch_add(1, Ordering::SeqCst);
    }
}

struct PoolInner {
    entries: RwLock<HashMap<PoolKey, Arc<PooledConnection>>>,
    factory: Arc<dyn ClientFactory>,
    connect_policy: RetryPolicy,
    config: PoolConfig,
    disposed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    logger: SharedLogger,
}

impl PoolInner {
    /// Remove `entry` if it is still the pooled instance for `key`, then dispose it
    fn evict(&self, key: &PoolKey, entry: &Arc<PooledConnection>) {
        entry.failed.store(true, Ordering::SeqCst);
        let removed = {
            let mut entries = self.entries.write();
            if entries.get(key).is_some_and(|current| Arc::ptr_eq(current, entry)) {
                entries.remove(key)
            } else {
                None
            }
        };
        if let Some(removed) = removed {
            removed.client.dispose();
        }
    }

    fn sweep_idle(&self) -> usize {
        let removed: Vec<Arc<PooledConnection>> = {
            let mut entries = self.entries.write();
            let doomed: Vec<PoolKey> = entries
                .iter()
                .filter(|(_, e)| {
                    e.is_stale()
                        || (e.is_idle(self.config.idle_grace) && e.last_used().elapsed() > self.config.idle_timeout)
                })
                .map(|(k, _)| *k)
                .collect();
            doomed.iter().filter_map(|k| entries.remove(k)).collect()
        };

        for entry in &removed {
            self.logger.debug(&format!(
                "[ConnectionPool] Sweeping connection to '{}' (uses: {})",
                entry.client.server().name,
                entry.use_count()
            ));
            entry.client.dispose();
        }
        removed.len()
    }

    fn drain(&self) -> usize {
        let drained: Vec<Arc<PooledConnection>> = self.entries.write().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.client.dispose();
        }
        drained.len()
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

/// Shared pool of tool server connections
///
/// At most one pooled connection exists per (endpoint, credential) pair.
/// Concurrent requests for the same key resolve to a single instance and only
/// that instance is connected; a losing duplicate is disposed unused.
/// Cloning the pool yields another handle to the same connections.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a pool. When called inside a tokio runtime the idle sweep starts
    /// immediately; otherwise call [`ConnectionPool::sweep_idle`] yourself.
    pub fn new(factory: Arc<dyn ClientFactory>, config: PoolConfig, logger: SharedLogger) -> Self {
        Self::with_connect_policy(factory, config, RetryPolicy::connection().with_logger(logger.clone()), logger)
    }

    /// Create a pool with a custom handshake retry policy
    pub fn with_connect_policy(
        factory: Arc<dyn ClientFactory>,
        config: PoolConfig,
        connect_policy: RetryPolicy,
        logger: SharedLogger,
    ) -> Self {
        let inner = Arc::new(PoolInner {
            entries: RwLock::new(HashMap::new()),
            factory,
            connect_policy,
            config,
            disposed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
            logger,
        });

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let task = handle.spawn(sweep_loop(Arc::downgrade(&inner), inner.config.sweep_interval));
            *inner.sweeper.lock() = Some(task);
        }

        Self { inner }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Return a connected client for the server, creating and connecting one if needed
    pub async fn get_client(
        &self,
        server: &ServerDescriptor,
        cancel: &CancellationToken,
    ) -> McpResult<Arc<dyn ToolClient>> {
        let key = PoolKey::for_server(server);

        loop {
            if self.is_disposed() {
                return Err(McpError::Disposed);
            }

            let existing = self.inner.entries.read().get(&key).cloned();
            let entry = match existing {
                Some(entry) if entry.is_stale() => {
                    self.inner.logger.info(&format!(
                        "[ConnectionPool] Dropping stale connection to '{}'",
                        server.name
                    ));
                    self.inner.evict(&key, &entry);
                    continue;
                }
                Some(entry) => entry,
                None => self.insert_new(key, server)?,
            };

            let waiter = Waiter::enter(&entry.waiters);
            let outcome = self.ensure_connected(&entry, server, cancel).await;
            drop(waiter);

            if let Err(e) = outcome {
                // A caller cancelling its own request leaves the entry to
                // anyone else still waiting on the same handshake
                let own_cancellation = e.is_cancelled() && cancel.is_cancelled();
                if !own_cancellation || entry.waiters.load(Ordering::SeqCst) == 0 {
                    self.inner.evict(&key, &entry);
                }
                return Err(e);
            }

            entry.touch();
            return Ok(entry.client.clone());
        }
    }

    fn insert_new(&self, key: PoolKey, server: &ServerDescriptor) -> McpResult<Arc<PooledConnection>> {
        let candidate = Arc::new(PooledConnection::new(self.inner.factory.create(server)?));

        let winner = {
            let mut entries = self.inner.entries.write();
            if self.is_disposed() {
                drop(entries);
                candidate.client.dispose();
                return Err(McpError::Disposed);
            }
            entries.entry(key).or_insert_with(|| candidate.clone()).clone()
        };

        if Arc::ptr_eq(&winner, &candidate) {
            self.inner.logger.debug(&format!("[ConnectionPool] Created connection to '{}'", server.name));
        } else {
            self.inner.logger.debug(&format!(
                "[ConnectionPool] Lost creation race for '{}', discarding duplicate",
                server.name
            ));
            candidate.client.dispose();
        }
        Ok(winner)
    }

    async fn ensure_connected(
        &self,
        entry: &Arc<PooledConnection>,
        server: &ServerDescriptor,
        cancel: &CancellationToken,
    ) -> McpResult<()> {
        let client = &entry.client;
        let failed = &entry.failed;
        let policy = &self.inner.connect_policy;
        let context = RetryContext::server(server.name.clone());

        entry
            .ready
            .get_or_try_init(|| async move {
                // A waiter taking over after the first caller failed must not
                // start another handshake on an instance about to be evicted.
                if failed.load(Ordering::SeqCst) {
                    return Err(McpError::Connection(format!(
                        "a concurrent connection attempt to '{}' failed",
                        server.name
                    )));
                }
                let result = policy
                    .execute("connect", &context, cancel, move |_| async move {
                        match client.connect(cancel).await {
                            Ok(true) => Ok(()),
                            Ok(false) => Err(McpError::Connection(format!("handshake with '{}' failed", server.name))),
                            Err(McpError::Disposed) => Err(McpError::Connection(format!(
                                "connection to '{}' was discarded",
                                server.name
                            ))),
                            Err(e) => Err(e),
                        }
                    })
                    .await;
                if let Err(e) = &result {
                    if !(e.is_cancelled() && cancel.is_cancelled()) {
                        failed.store(true, Ordering::SeqCst);
                    }
                }
                result
            })
            .await
            .map(|_| ())
    }

    /// Remove and dispose the pooled connection for a server
    pub fn remove_client(&self, server: &ServerDescriptor) -> bool {
        let removed = self.inner.entries.write().remove(&PoolKey::for_server(server));
        match removed {
            Some(entry) => {
                entry.client.dispose();
                true
            }
            None => false,
        }
    }

    /// Connected clients currently pooled
    pub fn clients(&self) -> Vec<Arc<dyn ToolClient>> {
        self.inner
            .entries
            .read()
            .values()
            .filter(|e| e.is_valid())
            .map(|e| e.client.clone())
            .collect()
    }

    pub fn statistics(&self) -> PoolStatistics {
        let entries = self.inner.entries.read();
        let grace = self.inner.config.idle_grace;
        let idle = entries.values().filter(|e| e.is_idle(grace)).count();
        PoolStatistics {
            total: entries.len(),
            active: entries.len() - idle,
            idle,
            total_uses: entries.values().map(|e| e.use_count()).sum(),
        }
    }

    /// Remove connections idle past the timeout, plus any that lost their connection
    pub fn sweep_idle(&self) -> usize {
        self.inner.sweep_idle()
    }

    /// Dispose every pooled connection; the pool stays usable
    pub fn clear(&self) {
        let count = self.inner.drain();
        self.inner.logger.info(&format!("[ConnectionPool] Cleared {} connections", count));
    }

    /// Stop the sweep and dispose everything; later requests fail with `Disposed`
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.inner.sweeper.lock().take() {
            handle.abort();
        }
        let count = self.inner.drain();
        self.inner.logger.info(&format!("[ConnectionPool] Disposed ({} connections closed)", count));
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("statistics", &self.statistics())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

async fn sweep_loop(pool: Weak<PoolInner>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(inner) = pool.upgrade() else { break };
        if inner.disposed.load(Ordering::SeqCst) {
            break;
        }
        let removed = inner.sweep_idle();
        if removed > 0 {
            inner
                .logger
                .info(&format!("[ConnectionPool] Swept {} idle connections", removed));
        }
    }
}
