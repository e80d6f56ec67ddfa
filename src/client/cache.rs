use std::{
    fmt,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;

use super::errors::ClientError;

/// Cache key: the resource base name plus scoping qualifiers such as
/// `admin`, `public` or an entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: String,
    qualifiers: Vec<String>,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>) -> Self {
        QueryKey { resource: resource.into(), qualifiers: Vec::new() }
    }

    pub fn with(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn belongs_to(&self, resource: &str) -> bool {
        self.resource == resource
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)?;
        for qualifier in &self.qualifiers {
            write!(f, "/{}", qualifier)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    stale: bool,
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V, ClientError>>>;

/// TTL cache of query results with request de-duplication: concurrent
/// `fetch_with` calls for one key share a single network request.
pub struct QueryCache<V = Value> {
    entries: DashMap<QueryKey, CacheEntry<V>>,
    in_flight: DashMap<QueryKey, SharedFetch<V>>,
    ttl: Duration,
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        QueryCache {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            ttl,
        }
    }

    /// A cached value that is neither stale nor past its TTL.
    pub fn get_fresh(&self, key: &QueryKey) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.stale && entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Whatever is cached for the key, fresh or not.
    pub fn peek(&self, key: &QueryKey) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.entries.get(key).map(|entry| entry.stale)
    }

    pub fn insert(&self, key: QueryKey, value: V) {
        self.entries.insert(key, CacheEntry { value, fetched_at: Instant::now(), stale: false });
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serves a fresh cached value or runs `fetch`, joining a request already
    /// in flight for the same key. Successful results are cached unless the
    /// key was invalidated while the request was running.
    pub async fn fetch_with<F, Fut>(&self, key: QueryKey, fetch: F) -> Result<V, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, ClientError>> + Send + 'static,
    {
        if let Some(value) = self.get_fresh(&key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(value);
        }

        let shared = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                tracing::debug!("Joining in-flight request for {}", key);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let request = fetch().boxed().shared();
                entry.insert(request.clone());
                request
            }
        };

        let result = shared.clone().await;

        let owner = self
            .in_flight
            .remove_if(&key, |_, current| current.ptr_eq(&shared))
            .is_some();
        if owner {
            if let Ok(value) = &result {
                self.insert(key, value.clone());
            }
        }

        result
    }

    /// Marks every entry of a resource stale, then evicts them and forgets
    /// in-flight requests so late responses are not cached. Returns the
    /// evicted keys.
    pub fn invalidate_resource(&self, resource: &str) -> Vec<QueryKey> {
        for mut entry in self.entries.iter_mut() {
            if entry.key().belongs_to(resource) {
                entry.stale = true;
            }
        }

        let keys: Vec<QueryKey> = self
            .keys()
            .into_iter()
            .filter(|key| key.belongs_to(resource))
            .collect();
        for key in &keys {
            self.entries.remove(key);
        }
        self.in_flight.retain(|key, _| !key.belongs_to(resource));

        keys
    }
}

/// Keeps every view of a collection consistent after a mutation.
///
/// Only manipulates cache state; refetching the queued keys is left to the
/// caller (see `ContentService::refetch_invalidated`).
pub struct CacheCoordinator<V = Value> {
    cache: Arc<QueryCache<V>>,
    refetch_queue: Mutex<Vec<QueryKey>>,
}

impl<V> CacheCoordinator<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(cache: Arc<QueryCache<V>>) -> Self {
        CacheCoordinator { cache, refetch_queue: Mutex::new(Vec::new()) }
    }

    pub fn cache(&self) -> &Arc<QueryCache<V>> {
        &self.cache
    }

    /// Invalidates and evicts every entry keyed under `resource`, whatever its
    /// scoping, and schedules those keys for refetch.
    pub fn invalidate_and_refetch(&self, resource: &str) {
        let evicted = self.cache.invalidate_resource(resource);

        let mut queue = self.refetch_queue.lock();
        for key in &evicted {
            if !queue.contains(key) {
                queue.push(key.clone());
            }
        }

        tracing::info!("Invalidated {} cached queries for '{}'", evicted.len(), resource);
    }

    /// Drains the keys awaiting a refetch.
    pub fn take_refetch_queue(&self) -> Vec<QueryKey> {
        std::mem::take(&mut *self.refetch_queue.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> Arc<QueryCache> {
        Arc::new(QueryCache::new(Duration::from_secs(60)))
    }

    #[test]
    fn invalidation_covers_every_scope_of_a_resource() {
        let cache = cache();
        let services = QueryKey::new("services");
        let admin = QueryKey::new("services").with("admin");
        let public = QueryKey::new("services").with("public");
        let team = QueryKey::new("team");
        for key in [&services, &admin, &public, &team] {
            cache.insert(key.clone(), json!([]));
        }

        let coordinator = CacheCoordinator::new(cache.clone());
        coordinator.invalidate_and_refetch("services");

        for key in [&services, &admin, &public] {
            assert!(cache.get_fresh(key).is_none(), "{} still servable", key);
            assert!(cache.peek(key).is_none(), "{} not evicted", key);
        }
        assert!(cache.get_fresh(&team).is_some());

        let mut queued = coordinator.take_refetch_queue();
        queued.sort_by_key(|k| k.to_string());
        assert_eq!(queued, vec![services, admin, public]);
        assert!(coordinator.take_refetch_queue().is_empty());
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: QueryCache = QueryCache::new(Duration::ZERO);
        let key = QueryKey::new("projects");
        cache.insert(key.clone(), json!([1]));

        assert!(cache.get_fresh(&key).is_none());
        assert_eq!(cache.peek(&key), Some(json!([1])));
        assert_eq!(cache.is_stale(&key), Some(false));
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_request() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("team").with("public");

        let fetch = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, ClientError>(json!(["ada"]))
            }
        };

        let (a, b) = tokio::join!(
            cache.fetch_with(key.clone(), fetch(calls.clone())),
            cache.fetch_with(key.clone(), fetch(calls.clone())),
        );

        assert_eq!(a.unwrap(), json!(["ada"]));
        assert_eq!(b.unwrap(), json!(["ada"]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get_fresh(&key), Some(json!(["ada"])));

        cache.fetch_with(key, fetch(calls.clone())).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let cache = cache();
        let key = QueryKey::new("content");

        let result = cache
            .fetch_with(key.clone(), || async { Err::<Value, _>(ClientError::Network("down".into())) })
            .await;

        assert!(result.is_err());
        assert!(cache.peek(&key).is_none());
    }

    #[tokio::test]
    async fn responses_landing_after_invalidation_are_dropped() {
        let cache = cache();
        let key = QueryKey::new("services").with("admin");

        let (result, _) = tokio::join!(
            cache.fetch_with(key.clone(), || async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, ClientError>(json!(["old"]))
            }),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                cache.invalidate_resource("services");
            }
        );

        assert_eq!(result.unwrap(), json!(["old"]));
        assert!(cache.peek(&key).is_none());
    }
}
