//! Connection pool for tool servers
//!
//! One authoritative pool per host: built at startup, disposed at shutdown.

mod connection_pool;

pub use connection_pool::{ConnectionPool, PoolConfig, PoolKey, PoolStatistics, PooledConnection};
