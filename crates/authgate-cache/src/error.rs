/// Errors that can occur in the cache layer.
///
/// A missing or expired key is NOT an error: reads return `Ok(None)`.
/// Everything here is a transport-level failure that callers may retry.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache client was closed and no longer accepts commands.
    #[error("cache client closed")]
    Closed,

    /// The backend could not serve the command (connection refused,
    /// cluster failover, pool exhausted).
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// The key is empty or otherwise rejected by the backend.
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
}
