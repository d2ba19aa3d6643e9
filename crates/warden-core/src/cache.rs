use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use warden_types::error::CoreError;

/// Caches one computed value with a freshness window.
///
/// Concurrent misses collapse into a single producer run: callers that
/// lose the race for the refresh lock re-check the slot after acquiring
/// it and find the value the winner just stored. A failed producer caches
/// nothing, so the next caller retries.
#[derive(Clone)]
pub struct TimedCache<T> {
    inner: Arc<CacheInner<T>>,
}

struct CacheInner<T> {
    slot: Mutex<Option<(T, Instant)>>,
    // Held across the producer await; serializes refreshes.
    refresh: tokio::sync::Mutex<()>,
}

impl<T: Clone> TimedCache<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slot: Mutex::new(None),
                refresh: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Returns the cached value if younger than `freshness`, otherwise
    /// runs `producer` and stores its result.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        freshness: Duration,
        producer: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        if let Some(value) = self.fresh_value(freshness) {
            return Ok(value);
        }

        let _refresh = self.inner.refresh.lock().await;

        // Someone may have refreshed while we waited for the lock.
        if let Some(value) = self.fresh_value(freshness) {
            return Ok(value);
        }

        let value = producer().await?;
        *self.inner.slot.lock().unwrap() = Some((value.clone(), Instant::now()));
        Ok(value)
    }

    /// The cached value regardless of age, if any.
    pub fn peek(&self) -> Option<T> {
        self.inner
            .slot
            .lock()
            .unwrap()
            .as_ref()
            .map(|(value, _)| value.clone())
    }

    fn fresh_value(&self, freshness: Duration) -> Option<T> {
        let slot = self.inner.slot.lock().unwrap();
        match slot.as_ref() {
            Some((value, stored_at)) if stored_at.elapsed() < freshness => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Default for TimedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn serves_fresh_and_refreshes_stale() {
        let cache = TimedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let produce = |calls: Arc<AtomicUsize>| async move {
            Ok::<_, CoreError>(calls.fetch_add(1, Ordering::SeqCst) + 1)
        };

        let window = Duration::from_secs(60);
        let first = cache
            .get_or_refresh(window, || produce(calls.clone()))
            .await
            .unwrap();
        assert_eq!(first, 1);

        // Within the window: cached, no second producer call.
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = cache
            .get_or_refresh(window, || produce(calls.clone()))
            .await
            .unwrap();
        assert_eq!(second, 1);

        // Past the window: refreshed.
        tokio::time::advance(Duration::from_secs(31)).await;
        let third = cache
            .get_or_refresh(window, || produce(calls.clone()))
            .await
            .unwrap();
        assert_eq!(third, 2);
    }

    #[tokio::test]
    async fn concurrent_misses_run_one_producer() {
        let cache: TimedCache<u32> = TimedCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(Duration::from_secs(60), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, CoreError>(99)
                    })
                    .await
                    .unwrap()
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_failed_producer_caches_nothing() {
        let cache: TimedCache<u32> = TimedCache::new();

        let failed = cache
            .get_or_refresh(Duration::from_secs(60), || async {
                Err(CoreError::Upstream("probe down".into()))
            })
            .await;
        assert!(failed.is_err());
        assert!(cache.peek().is_none());

        let ok = cache
            .get_or_refresh(Duration::from_secs(60), || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(ok, 5);
    }
}
