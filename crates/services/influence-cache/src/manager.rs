use influence_types::{Direction, Key, ProfileRecord, Query};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info, warn};

use crate::cache::ProfileCache;
use crate::config::{ManagerConfig, SchemaVersion};
use crate::error::ManagerError;
use crate::fetch::FetchTask;
use crate::identity::IdentityMap;
use crate::metrics;
use crate::publisher::{ProfileObserver, Publisher, SubscriptionId};
use crate::remote::{HttpRemoteSource, RemoteSource};
use crate::schema::{self, Schema};

/// What `ProfileManager::request` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Served from the cache; observers were notified before returning.
    Cached,
    /// Handed to the worker pool; observers hear about it on completion.
    Dispatched,
}

/// State shared between the manager handle and its fetch tasks.
pub(crate) struct ManagerInner {
    pub(crate) cache: ProfileCache,
    pub(crate) identities: IdentityMap,
    pub(crate) publisher: Publisher,
    pub(crate) schema: Arc<dyn Schema>,
    pub(crate) source: Arc<dyn RemoteSource>,
    pub(crate) timeout: Duration,
    api_key: RwLock<String>,
    runtime: Handle,
    workers: Arc<Semaphore>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl ManagerInner {
    pub(crate) fn api_key(&self) -> String {
        self.api_key.read().clone()
    }
}

/// Counts a task from dispatch until it finishes, even if an observer panics.
struct InFlight(Arc<ManagerInner>);

impl InFlight {
    fn enter(inner: &Arc<ManagerInner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(inner.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Client-side profile cache with an asynchronous fetch pipeline.
///
/// Requests for slices already in the cache are answered synchronously.
/// Everything else becomes a fetch task on a bounded worker pool whose
/// results are merged into the cache and pushed to every subscribed
/// observer. Cloning the manager is cheap and clones share all state.
#[derive(Clone)]
pub struct ProfileManager {
    inner: Arc<ManagerInner>,
}

impl ProfileManager {
    pub fn builder() -> ProfileManagerBuilder {
        ProfileManagerBuilder::default()
    }

    /// Manager talking HTTP to the configured service, on the current runtime.
    pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
        Self::builder().with_config(config).build()
    }

    /// Ask for `query` about `key`.
    ///
    /// Unless `force_refresh` is set, a cached record that already holds
    /// every slice of `query` is published immediately and nothing is
    /// fetched. Remote failures are never returned here; they go to the
    /// observers' error channel.
    pub fn request(
        &self,
        key: impl Into<Key>,
        query: Query,
        force_refresh: bool,
    ) -> Result<RequestOutcome, ManagerError> {
        let key = key.into();
        let schema = &self.inner.schema;
        if !schema.supports(query) {
            warn!("rejecting {} request for {}: not offered by the {} service", query, key, schema.version());
            return Err(ManagerError::Unsupported {
                query,
                schema: schema.version(),
            });
        }

        if !force_refresh {
            if let Some(record) = self.inner.cache.get_fresh(key.as_str(), query) {
                metrics::record_cache_hit(query.as_str());
                debug!("cache hit for {} {}", key, query);
                self.inner.publisher.publish(&record);
                return Ok(RequestOutcome::Cached);
            }
        }

        self.dispatch(key, query);
        Ok(RequestOutcome::Dispatched)
    }

    fn dispatch(&self, key: Key, query: Query) {
        metrics::record_dispatch(query.as_str());
        debug!("dispatching {} fetch for {}", query, key);

        let guard = InFlight::enter(&self.inner);
        let workers = self.inner.workers.clone();
        let task = FetchTask::new(key, query, self.inner.clone());
        self.inner.runtime.spawn(async move {
            let _guard = guard;
            // Queued tasks wait here until a worker slot frees up.
            match workers.acquire_owned().await {
                Ok(_permit) => task.run().await,
                Err(_) => warn!("worker pool closed, dropping {} fetch", query),
            }
        });
    }

    pub fn request_score(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Score, false)
    }

    pub fn refresh_score(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Score, true)
    }

    pub fn request_detail(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Detail, false)
    }

    pub fn refresh_detail(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Detail, true)
    }

    pub fn request_topics(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Topics, false)
    }

    pub fn refresh_topics(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Topics, true)
    }

    pub fn request_influenced_by(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Related(Direction::InfluencedBy), false)
    }

    pub fn refresh_influenced_by(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Related(Direction::InfluencedBy), true)
    }

    pub fn request_influencer_of(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Related(Direction::InfluencerOf), false)
    }

    pub fn refresh_influencer_of(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Related(Direction::InfluencerOf), true)
    }

    /// Both related lists in one round trip (second-generation service only).
    pub fn request_influence(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Influence, false)
    }

    pub fn refresh_influence(&self, key: impl Into<Key>) -> Result<RequestOutcome, ManagerError> {
        self.request(key, Query::Influence, true)
    }

    pub fn subscribe(&self, observer: Arc<dyn ProfileObserver>) -> SubscriptionId {
        self.inner.publisher.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.publisher.unsubscribe(id)
    }

    /// Replace the credential. Tasks already started keep the old one.
    pub fn set_api_key(&self, api_key: impl Into<String>) {
        *self.inner.api_key.write() = api_key.into();
        info!("api key updated");
    }

    /// Snapshot of the cached record for `key`, if any.
    pub fn profile(&self, key: &str) -> Option<ProfileRecord> {
        self.inner.cache.get(key)
    }

    /// Service-internal ID known for `key`.
    pub fn remote_id(&self, key: &str) -> Option<String> {
        self.inner.identities.get(key)
    }

    pub fn cache(&self) -> &ProfileCache {
        &self.inner.cache
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.inner.schema.version()
    }

    /// Fetch tasks dispatched and not yet finished, queued ones included.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once no fetch task is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Builder for `ProfileManager`.
#[derive(Default)]
pub struct ProfileManagerBuilder {
    config: ManagerConfig,
    source: Option<Arc<dyn RemoteSource>>,
    schema: Option<Arc<dyn Schema>>,
    runtime: Option<Handle>,
}

impl ProfileManagerBuilder {
    pub fn with_config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `source` instead of an HTTP client built from the configuration.
    pub fn with_source(mut self, source: Arc<dyn RemoteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the schema chosen by `config.schema`.
    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Runtime the fetch tasks are spawned on. Defaults to the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<ProfileManager, ManagerError> {
        let config = self.config;
        if config.worker_threads == 0 {
            return Err(ManagerError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if config.request_timeout().is_zero() {
            return Err(ManagerError::Config(
                "request_timeout_ms must be at least 1".to_string(),
            ));
        }

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ManagerError::NoRuntime)?,
        };
        let schema = self.schema.unwrap_or_else(|| schema::for_version(config.schema));
        let timeout = config.request_timeout();
        let source: Arc<dyn RemoteSource> = match self.source {
            Some(source) => source,
            None => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| schema.default_base_url().to_string());
                Arc::new(HttpRemoteSource::new(base_url, timeout)?)
            }
        };

        info!(
            "profile manager ready: {} service, {} workers, {:?} timeout",
            schema.version(),
            config.worker_threads,
            timeout
        );

        Ok(ProfileManager {
            inner: Arc::new(ManagerInner {
                cache: ProfileCache::new(),
                identities: IdentityMap::new(),
                publisher: Publisher::new(),
                schema,
                source,
                timeout,
                api_key: RwLock::new(config.api_key),
                runtime,
                workers: Arc::new(Semaphore::new(config.worker_threads)),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_a_runtime() {
        let result = ProfileManager::builder()
            .with_config(ManagerConfig::new("k"))
            .build();
        assert!(matches!(result, Err(ManagerError::NoRuntime)));
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let result = ProfileManager::builder()
            .with_config(ManagerConfig::new("k").with_worker_threads(0))
            .build();
        assert!(matches!(result, Err(ManagerError::Config(_))));
    }

    #[tokio::test]
    async fn zero_timeout_is_rejected() {
        let mut config = ManagerConfig::new("k");
        config.request_timeout_ms = 0;
        let result = ProfileManager::builder().with_config(config).build();
        assert!(matches!(result, Err(ManagerError::Config(_))));

        // rounds down to zero milliseconds
        let result = ProfileManager::builder()
            .with_config(ManagerConfig::new("k").with_timeout(Duration::from_micros(200)))
            .build();
        assert!(matches!(result, Err(ManagerError::Config(_))));
    }

    #[tokio::test]
    async fn unsupported_queries_fail_synchronously() {
        let manager = ProfileManager::new(ManagerConfig::new("k")).unwrap();
        let err = manager.request_influence("alice").unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Unsupported { query: Query::Influence, schema: SchemaVersion::V1 }
        ));
        assert_eq!(manager.in_flight(), 0);
        assert!(manager.cache().is_empty());
    }
}
