use influence_types::{DecodeError, FetchError, Key, ProfileRecord, Query, RemoteError, SliceData};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::manager::ManagerInner;
use crate::metrics;
use crate::remote::RemoteRequest;
use crate::API_KEY_PARAM;

/// One remote fetch for `(key, query)`, run on the worker pool.
pub(crate) struct FetchTask {
    key: Key,
    query: Query,
    inner: Arc<ManagerInner>,
}

impl FetchTask {
    pub(crate) fn new(key: Key, query: Query, inner: Arc<ManagerInner>) -> Self {
        Self { key, query, inner }
    }

    /// Run to completion. Failures are logged and handed to the observers'
    /// error channel; the cache is only touched on success.
    pub(crate) async fn run(self) {
        let started = Instant::now();
        let label = self.query.as_str();

        match self.execute().await {
            Ok(record) => {
                metrics::record_fetch_success(label);
                debug!(
                    key = %self.key,
                    query = label,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "merged fetched slices"
                );
                self.inner.publisher.publish(&record);
            }
            Err(err) => {
                metrics::record_fetch_failure(label, err.reason());
                warn!(
                    key = %self.key,
                    query = label,
                    reason = err.reason(),
                    "fetch failed: {}",
                    err
                );
                self.inner.publisher.publish_error(&self.key, self.query, &err);
            }
        }

        metrics::observe_fetch_duration(label, started.elapsed().as_secs_f64());
    }

    async fn execute(&self) -> Result<ProfileRecord, FetchError> {
        // In-flight tasks keep the credential they started with.
        let api_key = self.inner.api_key();
        let schema = &self.inner.schema;

        let remote_id = self.resolve_identity(&api_key).await?;
        let request = schema
            .request(&self.key, remote_id.as_deref(), self.query)?
            .param(API_KEY_PARAM, api_key);

        let doc = self.call(&request).await?;
        let fields = schema.decode(self.query, doc)?;

        let mappings: Vec<(Key, String)> = fields
            .iter()
            .filter_map(|data| match data {
                SliceData::Related { entries, .. } => Some(entries),
                _ => None,
            })
            .flatten()
            .filter_map(|e| e.remote_id.clone().map(|id| (e.key.clone(), id)))
            .collect();

        let record = self
            .inner
            .cache
            .upsert_all(&self.key, fields)
            .ok_or(DecodeError::EmptyResult("slices"))?;

        if !mappings.is_empty() {
            self.inner.identities.extend(mappings);
        }
        Ok(record)
    }

    /// Service-internal ID for the key, resolving it first when the schema
    /// addresses profiles by ID and no mapping is cached yet.
    async fn resolve_identity(&self, api_key: &str) -> Result<Option<String>, FetchError> {
        let schema = &self.inner.schema;
        if !schema.needs_identity() {
            return Ok(None);
        }
        if let Some(id) = self.inner.identities.get(self.key.as_str()) {
            return Ok(Some(id));
        }

        let request = schema
            .identity_request(&self.key)
            .ok_or_else(|| FetchError::MissingIdentity(self.key.clone()))?
            .param(API_KEY_PARAM, api_key);

        metrics::record_identity_resolution();
        let doc = self.call(&request).await?;
        let id = schema
            .decode_identity(doc)
            .map_err(|_| FetchError::MissingIdentity(self.key.clone()))?;

        debug!("resolved {} to remote id {}", self.key, id);
        self.inner.identities.insert(self.key.clone(), id.clone());
        Ok(Some(id))
    }

    async fn call(&self, request: &RemoteRequest) -> Result<serde_json::Value, RemoteError> {
        let timeout = self.inner.timeout;
        match tokio::time::timeout(timeout, self.inner.source.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Transport(format!(
                "request {} timed out after {:?}",
                request, timeout
            ))),
        }
    }
}
