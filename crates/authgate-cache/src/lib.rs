//! Cache abstraction layer for Authgate.
//!
//! Provides the [`CacheBackend`] trait: a key-value store with per-key
//! expirations and a set-if-absent primitive. The session layer uses it both
//! as its session store and as a distributed lock, so any backend that can
//! offer `SET key value EX ttl`, `SET key value NX EX ttl`, `DEL`, and a
//! prefix scan can sit underneath it.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process backend ([`MemoryCache`]) with lazy
//!   expiry and an optional background sweeper.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::CacheError;
#[cfg(feature = "memory")]
pub use memory::MemoryCache;

use std::future::Future;
use std::time::Duration;

/// A key-value cache with TTLs.
///
/// The handle is created once at startup, shared by every request task, and
/// closed at shutdown with [`close`](Self::close).
///
/// A `ttl` of [`Duration::ZERO`] means "no expiry".
pub trait CacheBackend: Send + Sync + 'static {
    /// Reads a value. Absent and expired keys both yield `Ok(None)`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    /// Writes a value, replacing any previous value and TTL.
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Writes a value only if the key is absent (or expired).
    ///
    /// Returns `true` iff this call created the key. The check and the write
    /// are atomic with respect to every other command on the same key.
    fn set_nx(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Removes a key. Returns `true` if a live value was removed.
    fn delete(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Lists the live keys that start with `prefix`, in sorted order.
    fn scan_prefix(
        &self,
        prefix: &str,
    ) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Closes the client. Every later command fails with
    /// [`CacheError::Closed`].
    fn close(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}
