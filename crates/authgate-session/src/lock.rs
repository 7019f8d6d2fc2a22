//! Refresh lock: single-flight guard keyed by refresh-token value.
//!
//! The lock is a `refresh_lock:{token}` cache entry written with
//! set-if-absent and a short TTL. Whoever creates the entry holds the lock;
//! everyone else is told to back off. The TTL bounds how long a holder that
//! died without releasing can block the token.

use std::sync::Arc;
use std::time::Duration;

use authgate_cache::{CacheBackend, CacheError};

use crate::store::keys;
use crate::token;

/// Cache-backed mutual exclusion for refreshes of one token.
pub struct RefreshLock<C> {
    backend: Arc<C>,
    ttl: Duration,
}

impl<C: CacheBackend> RefreshLock<C> {
    pub fn new(backend: Arc<C>, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Maximum time a marker survives without a release.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tries to take the lock for `refresh_token`.
    ///
    /// Returns `true` iff this call created the marker. `false` means a
    /// refresh of the same token is already in flight.
    pub async fn acquire(&self, refresh_token: &str) -> Result<bool, CacheError> {
        let marker = token::unix_millis().to_string().into_bytes();
        self.backend
            .set_nx(&keys::refresh_lock(refresh_token), marker, self.ttl)
            .await
    }

    /// Deletes the marker unconditionally.
    pub async fn release(&self, refresh_token: &str) -> Result<(), CacheError> {
        self.backend.delete(&keys::refresh_lock(refresh_token)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_cache::MemoryCache;

    fn lock(ttl_secs: u64) -> RefreshLock<MemoryCache> {
        RefreshLock::new(Arc::new(MemoryCache::open()), Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn test_acquire_second_caller_is_refused() {
        let lock = lock(5);

        assert!(lock.acquire("tok").await.unwrap());
        assert!(!lock.acquire("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_acquire_different_tokens_do_not_contend() {
        let lock = lock(5);

        assert!(lock.acquire("tok-a").await.unwrap());
        assert!(lock.acquire("tok-b").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_lets_next_caller_in() {
        let lock = lock(5);
        lock.acquire("tok").await.unwrap();

        lock.release("tok").await.unwrap();

        assert!(lock.acquire("tok").await.unwrap());
    }

    #[tokio::test]
    async fn test_release_without_holder_is_ok() {
        let lock = lock(5);
        lock.release("never-taken").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lock_expires_after_ttl() {
        let lock = lock(5);
        lock.acquire("tok").await.unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(lock.acquire("tok").await.unwrap(), "crashed holder must not block forever");
    }
}
