//! Integration tests for the in-process cache backend.
//!
//! These exercise the properties the session layer leans on: `set_nx` is a
//! real mutual-exclusion primitive under concurrent tasks, and the sweeper
//! reclaims expired entries without anyone reading them.

#[cfg(feature = "memory")]
mod memory {
    use std::sync::Arc;
    use std::time::Duration;

    use authgate_cache::{CacheBackend, MemoryCache};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_set_nx_concurrent_callers_exactly_one_wins() {
        let cache = Arc::new(MemoryCache::open());
        let mut tasks = tokio::task::JoinSet::new();

        for caller in 0..32u8 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move {
                cache
                    .set_nx("refresh_lock:abc", vec![caller], Duration::from_secs(5))
                    .await
                    .expect("set_nx should not fail")
            });
        }

        let mut winners = 0;
        while let Some(won) = tasks.join_next().await {
            if won.expect("task should not panic") {
                winners += 1;
            }
        }

        assert_eq!(winners, 1, "exactly one caller may take the marker");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_untouched_entries() {
        let cache = Arc::new(MemoryCache::open());
        cache
            .set("pwd_reset:t", b"x".to_vec(), Duration::from_secs(1))
            .await
            .unwrap();
        let sweeper = cache.spawn_sweeper(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(cache.is_empty().await);
        assert!(!sweeper.is_finished());
        sweeper.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_after_close() {
        let cache = Arc::new(MemoryCache::open());
        let sweeper = cache.spawn_sweeper(Duration::from_secs(1));

        cache.close().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .expect("sweeper should exit once the cache is closed")
            .expect("sweeper should not panic");
    }
}
