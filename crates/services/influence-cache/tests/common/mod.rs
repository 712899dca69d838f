#![allow(dead_code)]

use async_trait::async_trait;
use influence_cache::{
    FetchError, Key, ManagerConfig, ProfileManager, ProfileObserver, ProfileRecord, Query,
    RemoteError, RemoteRequest, RemoteSource, SchemaVersion,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

/// In-memory `RemoteSource` answering from a path table.
///
/// Every call is recorded. When gated, each call waits for a permit on the
/// gate before answering, so tests control completion order.
#[derive(Default)]
pub struct ScriptedSource {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<RemoteRequest>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(path.to_string(), reply);
    }

    pub fn json(&self, path: &str, doc: Value) {
        self.route(path, Reply::Json(doc));
    }

    /// Hold calls to `path` until permits are added to the returned gate.
    pub fn gate(&self, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert(path.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|r| r.path == path).count()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in progress at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    async fn fetch(&self, request: &RemoteRequest) -> Result<Value, RemoteError> {
        self.calls.lock().unwrap().push(request.clone());
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(&request.path).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let reply = self.routes.lock().unwrap().get(&request.path).cloned();
        self.active.fetch_sub(1, Ordering::SeqCst);
        match reply {
            Some(Reply::Json(doc)) => Ok(doc),
            Some(Reply::Status(status)) => Err(RemoteError::Status {
                status,
                body: String::new(),
            }),
            None => Err(RemoteError::Status {
                status: 404,
                body: format!("no route for {}", request.path),
            }),
        }
    }
}

/// Observer that keeps everything it is told.
#[derive(Default)]
pub struct Recorder {
    updates: Mutex<Vec<ProfileRecord>>,
    errors: Mutex<Vec<(Key, Query, String)>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updates(&self) -> Vec<ProfileRecord> {
        self.updates.lock().unwrap().clone()
    }

    pub fn updates_for(&self, key: &str) -> Vec<ProfileRecord> {
        self.updates()
            .into_iter()
            .filter(|r| r.key().as_str() == key)
            .collect()
    }

    pub fn errors(&self) -> Vec<(Key, Query, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl ProfileObserver for Recorder {
    fn on_update(&self, record: &ProfileRecord) {
        self.updates.lock().unwrap().push(record.clone());
    }

    fn on_error(&self, key: &Key, query: Query, error: &FetchError) {
        self.errors
            .lock()
            .unwrap()
            .push((key.clone(), query, error.reason().to_string()));
    }
}

pub fn manager(source: Arc<ScriptedSource>, schema: SchemaVersion) -> ProfileManager {
    manager_with(source, ManagerConfig::new("test-key").with_schema(schema))
}

pub fn manager_with(source: Arc<ScriptedSource>, config: ManagerConfig) -> ProfileManager {
    ProfileManager::builder()
        .with_config(config)
        .with_source(source)
        .build()
        .expect("manager builds inside a runtime")
}

/// Poll until `cond` holds, failing the test after a couple of seconds.
pub async fn eventually<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub fn v1_score(score: f64) -> Value {
    serde_json::json!({"status": 200, "users": [{"twitter_screen_name": "x", "kscore": score}]})
}

pub fn v1_topics(topics: &[&str]) -> Value {
    serde_json::json!({"status": 200, "users": [{"twitter_screen_name": "x", "topics": topics}]})
}

pub fn v1_detail(score: f64, class: &str) -> Value {
    serde_json::json!({"status": 200, "users": [{"twitter_id": "1", "twitter_screen_name": "x", "score": {
        "kscore": score, "slope": 0.3, "description": "shares often",
        "kclass_id": 7, "kclass": class, "kclass_description": "connects people",
        "network_score": 41.0, "amplification_score": 22.5, "true_reach": 512.0,
        "delta_1day": 0.25, "delta_5day": -1.5
    }}]})
}
