use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, error};

use crate::api::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Sessions,
    Blocklist,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sessions => f.write_str("sessions"),
            Self::Blocklist => f.write_str("blocklist"),
        }
    }
}

/// Polling, staleness and retry settings for one read query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPolicy {
    /// Zero disables background polling.
    pub refetch_interval: Duration,
    /// How long a successful load is served without refetching.
    pub stale_time: Duration,
    /// Retries after the first failed attempt.
    pub retries: usize,
    pub retry_delay: Duration,
}

impl QueryPolicy {
    pub fn sessions() -> Self {
        Self {
            refetch_interval: Duration::from_secs(30),
            stale_time: Duration::from_secs(15),
            retries: 2,
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn blocklist() -> Self {
        Self {
            refetch_interval: Duration::from_secs(60),
            stale_time: Duration::ZERO,
            retries: 2,
            retry_delay: Duration::from_secs(5),
        }
    }
}

struct Entry<T> {
    data: Option<Vec<T>>,
    fetched_at: Option<Instant>,
    /// Invalidation generation the stored data was loaded under.
    generation: u64,
}

impl<T> Entry<T> {
    /// Cached data that can answer a request issued at `requested_at`.
    ///
    /// A load that finished after the request was issued always qualifies,
    /// so callers queued behind an in-flight load share its result. Data
    /// loaded before the latest invalidation never qualifies.
    fn reusable(
        &self,
        requested_at: Instant,
        stale_time: Duration,
        force: bool,
        generation: u64,
    ) -> Option<&Vec<T>> {
        if self.generation != generation {
            return None;
        }
        let data = self.data.as_ref()?;
        let fetched_at = self.fetched_at?;
        if fetched_at >= requested_at || (!force && fetched_at.elapsed() < stale_time) {
            Some(data)
        } else {
            None
        }
    }
}

/// Cached result of one read query.
///
/// Loads are serialized per query. Failures are retried on a fixed delay and,
/// once retries run out, resolve to an empty list instead of an error.
/// Invalidation never waits on an in-flight load.
pub struct Query<T> {
    key: QueryKey,
    policy: QueryPolicy,
    /// Held for the whole load, retries included.
    load_lock: tokio::sync::Mutex<()>,
    /// Only held for reads and writes of the entry, never across an await.
    entry: Mutex<Entry<T>>,
    generation: AtomicU64,
    tx: watch::Sender<Vec<T>>,
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(key: QueryKey, policy: QueryPolicy) -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            key,
            policy,
            load_lock: tokio::sync::Mutex::new(()),
            entry: Mutex::new(Entry {
                data: None,
                fetched_at: None,
                generation: 0,
            }),
            generation: AtomicU64::new(0),
            tx,
        }
    }

    pub fn key(&self) -> QueryKey {
        self.key
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    /// Receives every completed load.
    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.tx.subscribe()
    }

    /// Last loaded value without triggering a load. Empty before the first load.
    pub fn snapshot(&self) -> Vec<T> {
        self.tx.borrow().clone()
    }

    /// Marks the cached value stale so the next `fetch` goes upstream.
    /// A load already in flight still completes, but its result is stale on arrival.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("Invalidated {} query", self.key);
    }

    /// Returns the cached value while fresh, otherwise loads it.
    pub async fn fetch<F, Fut>(&self, fetcher: F) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        self.fetch_inner(fetcher, false).await
    }

    /// Loads regardless of `stale_time`. Used by the poller.
    pub async fn refresh<F, Fut>(&self, fetcher: F) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        self.fetch_inner(fetcher, true).await
    }

    fn lock_entry(&self) -> MutexGuard<'_, Entry<T>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self, requested_at: Instant, force: bool) -> Option<Vec<T>> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.lock_entry()
            .reusable(requested_at, self.policy.stale_time, force, generation)
            .cloned()
    }

    async fn fetch_inner<F, Fut>(&self, fetcher: F, force: bool) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        let requested_at = Instant::now();
        if let Some(data) = self.cached(requested_at, force) {
            return data;
        }

        let _loading = self.load_lock.lock().await;
        if let Some(data) = self.cached(requested_at, force) {
            return data;
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let data = self.load(fetcher).await;
        {
            let mut entry = self.lock_entry();
            entry.data = Some(data.clone());
            entry.fetched_at = Some(Instant::now());
            entry.generation = generation;
        }
        self.tx.send_replace(data.clone());
        data
    }

    async fn load<F, Fut>(&self, fetcher: F) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, ClientError>>,
    {
        let strategy = FixedInterval::new(self.policy.retry_delay).take(self.policy.retries);
        match Retry::start(strategy, fetcher).await {
            Ok(data) => {
                debug!("Loaded {} query: {} records", self.key, data.len());
                data
            }
            Err(e) => {
                error!(
                    query = %self.key,
                    attempts = self.policy.retries + 1,
                    error = %e,
                    "Failed to fetch {}, falling back to an empty list",
                    self.key
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn policy(stale_time: Duration, retries: usize) -> QueryPolicy {
        QueryPolicy {
            refetch_interval: Duration::ZERO,
            stale_time,
            retries,
            retry_delay: Duration::ZERO,
        }
    }

    fn http_error() -> ClientError {
        ClientError::Http {
            status: 503,
            message: "Service Unavailable".into(),
        }
    }

    #[tokio::test]
    async fn fresh_value_is_served_from_cache() {
        let query = Query::new(QueryKey::Sessions, policy(Duration::from_secs(3600), 0));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        };

        assert_eq!(query.fetch(fetcher).await, vec![1, 2, 3]);
        assert_eq!(query.fetch(fetcher).await, vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let query = Query::new(QueryKey::Blocklist, policy(Duration::from_secs(3600), 0));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![n])
        };

        assert_eq!(query.fetch(fetcher).await, vec![0]);
        query.invalidate();
        assert_eq!(query.fetch(fetcher).await, vec![1]);
        assert_eq!(query.fetch(fetcher).await, vec![1]);
    }

    #[tokio::test]
    async fn invalidation_during_load_is_not_lost() {
        let query = Query::new(QueryKey::Sessions, policy(Duration::from_secs(3600), 0));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(vec![n])
        };
        let invalidate_mid_load = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let started = Instant::now();
            query.invalidate();
            started.elapsed()
        };

        let (first, waited) = tokio::join!(query.fetch(fetcher), invalidate_mid_load);
        assert_eq!(first, vec![0]);
        assert!(waited < Duration::from_millis(50), "invalidate waited {waited:?}");

        // the load that straddled the invalidation is stale on arrival
        assert_eq!(query.fetch(fetcher).await, vec![1]);
        assert_eq!(query.fetch(fetcher).await, vec![1]);
    }

    #[tokio::test]
    async fn zero_stale_time_always_reloads() {
        let query = Query::new(QueryKey::Blocklist, policy(Duration::ZERO, 0));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["222".to_string()])
        };

        query.fetch(fetcher).await;
        query.fetch(fetcher).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_ignores_stale_time() {
        let query = Query::new(QueryKey::Sessions, policy(Duration::from_secs(3600), 0));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![()])
        };

        query.fetch(fetcher).await;
        query.refresh(fetcher).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let query = Query::new(QueryKey::Sessions, policy(Duration::ZERO, 2));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(http_error())
            } else {
                Ok(vec![42])
            }
        };

        assert_eq!(query.fetch(fetcher).await, vec![42]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_resolve_to_empty() {
        let query: Query<u32> = Query::new(QueryKey::Sessions, policy(Duration::ZERO, 2));
        let calls = &AtomicUsize::new(0);
        let fetcher = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(http_error())
        };

        assert!(query.fetch(fetcher).await.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn concurrent_fetches_are_coalesced() {
        let query = Query::new(QueryKey::Blocklist, policy(Duration::ZERO, 0));
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(vec!["111".to_string()])
            }
        };

        let (a, b) = tokio::join!(query.fetch(fetcher), query.fetch(fetcher));
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribers_see_loads() {
        let query = Query::new(QueryKey::Sessions, policy(Duration::ZERO, 0));
        let mut rx = query.subscribe();
        assert!(query.snapshot().is_empty());

        query.fetch(|| async { Ok(vec![7]) }).await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), vec![7]);
        assert_eq!(query.snapshot(), vec![7]);
    }
}
