//! Shared constants for omnivec.

/// Maximum number of results for any search (DoS protection).
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Default number of results when the caller does not specify a limit.
pub const DEFAULT_QUERY_LIMIT: usize = 10;

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Request timeout in seconds for HTTP vector-service providers.
pub const HTTP_TIMEOUT_SECS: u64 = 30;
