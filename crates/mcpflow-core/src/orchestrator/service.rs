//! Host-facing tool service
//!
//! `ToolService` is built once at startup and owns everything that outlives a
//! single run: the settings snapshot, the connection pool, the tool cache,
//! the run gate and the orchestrator. Each `complete` call builds a fresh
//! catalog and per-run counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::engine::{Orchestrator, RunOutcome};
use super::error::{OrchestratorError, OrchestratorResult};
use super::observer::RunObserver;
use super::strategy::ToolStrategy;
use crate::completion::{CompletionClient, StreamTransport};
use crate::config::{Settings, SettingsStore};
use crate::logging::{SharedLogger, VerbosityLogger};
use crate::mcp::{ClientFactory, McpError};
use crate::pool::{ConnectionPool, PoolConfig, PoolStatistics};
use crate::tools::{ConcurrentExecutor, ToolCache, ToolCatalog};
use crate::types::{CancellationToken, ConversationMessage};

/// Picks the strategy a run uses
pub trait StrategyResolver: Send + Sync {
    fn resolve(&self, settings: &Settings, prompt: Option<&str>) -> ToolStrategy;
}

/// Resolves through the settings' prompt bindings
///
/// MCP globally off, no prompt selected, or an unbound prompt all run Disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SettingsStrategyResolver;

impl StrategyResolver for SettingsStrategyResolver {
    fn resolve(&self, settings: &Settings, prompt: Option<&str>) -> ToolStrategy {
        if !settings.mcp.enabled {
            return ToolStrategy::Disabled;
        }
        prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .and_then(|p| settings.strategy_for_prompt(p))
            .unwrap_or(ToolStrategy::Disabled)
    }
}

/// Snapshot of service usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatistics {
    pub pool: PoolStatistics,
    pub cached_servers: usize,
    pub max_concurrent_runs: usize,
    pub available_runs: usize,
}

/// Per-settings state swapped as a whole on reinitialize
struct Runtime {
    settings: Settings,
    orchestrator: Arc<Orchestrator>,
    cache: Arc<ToolCache>,
    gate: Arc<Semaphore>,
    logger: SharedLogger,
}

pub struct ToolService {
    store: Arc<dyn SettingsStore>,
    transport: Arc<dyn StreamTransport>,
    resolver: Arc<dyn StrategyResolver>,
    pool: ConnectionPool,
    runtime: RwLock<Runtime>,
    base_logger: SharedLogger,
    disposed: AtomicBool,
}

impl ToolService {
    /// Load settings and build the service
    pub async fn start(
        store: Arc<dyn SettingsStore>,
        factory: Arc<dyn ClientFactory>,
        transport: Arc<dyn StreamTransport>,
        logger: SharedLogger,
    ) -> OrchestratorResult<Self> {
        let settings = store.load().await?;
        let runtime = build_runtime(settings, &transport, &logger);
        let pool_config = PoolConfig {
            idle_timeout: runtime.settings.mcp.idle_timeout(),
            ..PoolConfig::default()
        };
        let pool = ConnectionPool::new(factory, pool_config, runtime.logger.clone());

        runtime.logger.info(&format!(
            "[ToolService] Started (MCP {}, {} servers)",
            if runtime.settings.mcp.enabled { "enabled" } else { "disabled" },
            runtime.settings.mcp.servers.len()
        ));

        Ok(Self {
            store,
            transport,
            resolver: Arc::new(SettingsStrategyResolver),
            pool,
            runtime: RwLock::new(runtime),
            base_logger: logger,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn StrategyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn settings(&self) -> Settings {
        self.runtime.read().settings.clone()
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_live(&self) -> OrchestratorResult<()> {
        if self.is_disposed() {
            Err(OrchestratorError::Disposed)
        } else {
            Ok(())
        }
    }

    /// The strategy a run for `prompt` would use
    pub fn effective_strategy(&self, prompt: Option<&str>) -> ToolStrategy {
        self.resolver.resolve(&self.runtime.read().settings, prompt)
    }

    /// Answer `conversation` under the strategy bound to `prompt`
    pub async fn complete(
        &self,
        conversation: &[ConversationMessage],
        prompt: Option<&str>,
        observer: &mut dyn RunObserver,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<RunOutcome> {
        self.ensure_live()?;

        let (settings, orchestrator, cache, gate, logger) = {
            let runtime = self.runtime.read();
            (
                runtime.settings.clone(),
                runtime.orchestrator.clone(),
                runtime.cache.clone(),
                runtime.gate.clone(),
                runtime.logger.clone(),
            )
        };
        let _permit = acquire(gate, cancel).await?;

        let strategy = self.resolver.resolve(&settings, prompt);
        let config = settings.strategy_config(strategy);
        logger.info(&format!(
            "[ToolService] Run for prompt {:?} using {}",
            prompt.unwrap_or(""),
            strategy
        ));

        let catalog = if strategy.offers_tools() {
            self.build_catalog(&settings, strategy, &cache, &logger, cancel).await?
        } else {
            ToolCatalog::new(logger.clone())
        };

        orchestrator
            .run(conversation, &catalog, strategy, &config, observer, cancel)
            .await
    }

    async fn build_catalog(
        &self,
        settings: &Settings,
        strategy: ToolStrategy,
        cache: &ToolCache,
        logger: &SharedLogger,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<ToolCatalog> {
        let mut catalog = ToolCatalog::new(logger.clone());
        let servers = settings.mcp.usable_servers();
        if servers.is_empty() {
            if strategy.is_tool_mandatory() {
                logger.warn("[ToolService] Tool-forced run without any usable server");
                return Err(OrchestratorError::NoServers);
            }
            logger.info("[ToolService] No usable server, answering without tools");
            return Ok(catalog);
        }

        for server in &servers {
            let client = match self.pool.get_client(server, cancel).await {
                Ok(client) => client,
                Err(e) => {
                    self.check_pool_error(&e, cancel)?;
                    logger.warn(&format!("[ToolService] Skipping server '{}': {}", server.name, e));
                    continue;
                }
            };

            let key = ToolCache::key_for(server);
            let tools = match cache.get(&key) {
                Some(tools) => tools,
                None => match client.list_tools(cancel).await {
                    Ok(tools) => {
                        cache.set(key, tools.clone());
                        tools
                    }
                    Err(e) => {
                        self.check_pool_error(&e, cancel)?;
                        logger.warn(&format!(
                            "[ToolService] Could not list tools of '{}': {}",
                            server.name, e
                        ));
                        continue;
                    }
                },
            };
            catalog.add_server_as(server, client, tools);
        }

        logger.info(&format!(
            "[ToolService] Catalog ready: {} servers, {} of {} tools enabled",
            catalog.server_count(),
            catalog.enabled_count(),
            catalog.tool_count()
        ));
        Ok(catalog)
    }

    /// Errors that end the run instead of skipping one server
    fn check_pool_error(&self, error: &McpError, cancel: &CancellationToken) -> OrchestratorResult<()> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        if matches!(error, McpError::Disposed) && self.pool.is_disposed() {
            return Err(OrchestratorError::Disposed);
        }
        Ok(())
    }

    /// Reload settings and rebuild everything derived from them
    ///
    /// Runs already in progress finish on the previous configuration.
    pub async fn reinitialize(&self) -> OrchestratorResult<()> {
        self.ensure_live()?;
        let settings = self.store.load().await?;
        let mcp_enabled = settings.mcp.enabled;

        let runtime = build_runtime(settings, &self.transport, &self.base_logger);
        let logger = runtime.logger.clone();
        let previous = std::mem::replace(&mut *self.runtime.write(), runtime);
        previous.cache.clear();

        if !mcp_enabled {
            self.pool.clear();
        }
        logger.info(&format!(
            "[ToolService] Reinitialized (MCP {})",
            if mcp_enabled { "enabled" } else { "disabled" }
        ));
        Ok(())
    }

    /// Forget every cached tool list, in the service cache and in each client
    pub fn refresh_tools(&self) {
        let runtime = self.runtime.read();
        runtime.cache.clear();
        let clients = self.pool.clients();
        for client in &clients {
            client.invalidate_tools_cache();
        }
        runtime.logger.info(&format!(
            "[ToolService] Tool lists invalidated ({} clients)",
            clients.len()
        ));
    }

    pub fn statistics(&self) -> ServiceStatistics {
        let runtime = self.runtime.read();
        ServiceStatistics {
            pool: self.pool.statistics(),
            cached_servers: runtime.cache.len(),
            max_concurrent_runs: runtime.settings.mcp.max_concurrent_runs.max(1),
            available_runs: runtime.gate.available_permits(),
        }
    }

    /// Dispose the pool; every later call fails with `Disposed`
    pub fn shutdown(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let runtime = self.runtime.read();
        runtime.gate.close();
        runtime.cache.clear();
        self.pool.dispose();
        runtime.logger.info("[ToolService] Shut down");
    }
}

impl Drop for ToolService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn build_runtime(settings: Settings, transport: &Arc<dyn StreamTransport>, base_logger: &SharedLogger) -> Runtime {
    let logger: SharedLogger = Arc::new(VerbosityLogger::new(base_logger.clone(), settings.mcp.log_level));
    let completion = CompletionClient::new(transport.clone(), settings.completion.clone(), logger.clone());
    let executor = ConcurrentExecutor::new(settings.mcp.max_concurrent_tools, logger.clone());
    Runtime {
        orchestrator: Arc::new(Orchestrator::new(completion, executor, logger.clone())),
        cache: Arc::new(ToolCache::from_minutes(settings.mcp.tool_cache_minutes)),
        gate: Arc::new(Semaphore::new(settings.mcp.max_concurrent_runs.max(1))),
        settings,
        logger,
    }
}

async fn acquire(gate: Arc<Semaphore>, cancel: &CancellationToken) -> OrchestratorResult<OwnedSemaphorePermit> {
    tokio::select! {
        _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
        permit = gate.acquire_owned() => permit.map_err(|_| OrchestratorError::Disposed),
    }
}
