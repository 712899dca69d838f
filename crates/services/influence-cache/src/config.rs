use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// Default number of fetch tasks allowed to run at once.
pub const DEFAULT_WORKER_THREADS: usize = 10;

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Which incarnation of the remote scoring service to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SchemaVersion {
    /// Handle-addressed endpoints with per-slice requests.
    #[default]
    V1,
    /// Identity-addressed endpoints; handles are first mapped to service IDs.
    V2,
}

/// Configuration for a `ProfileManager`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ManagerConfig {
    /// Access credential sent with every request.
    pub api_key: String,

    /// Remote schema the manager speaks.
    pub schema: SchemaVersion,

    /// Upper bound on concurrently running fetch tasks.
    pub worker_threads: usize,

    /// Overrides the schema's default service root.
    pub base_url: Option<String>,

    /// Timeout applied to each remote round trip, in milliseconds. Must be
    /// non-zero.
    pub request_timeout_ms: u64,

    /// Optional log level string (e.g., "info", "influence_cache=debug").
    pub log_level: Option<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            schema: SchemaVersion::default(),
            worker_threads: DEFAULT_WORKER_THREADS,
            base_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            log_level: None,
        }
    }
}

impl ManagerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load manager configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        tracing::info!("Loading manager config from: {:?}", path_ref);
        let text = fs::read_to_string(path_ref).map_err(|e| {
            anyhow::anyhow!("Failed to read manager config file at {:?}: {}", path_ref, e)
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            anyhow::anyhow!("Failed to parse manager config from TOML at {:?}: {}", path_ref, e)
        })?;
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_schema(mut self, schema: SchemaVersion) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
