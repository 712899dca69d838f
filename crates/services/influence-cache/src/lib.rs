#![forbid(unsafe_code)]

//! Client-side profile cache and asynchronous fetch manager for an
//! influence scoring service.

pub mod cache;
pub mod config;
pub mod error;
mod fetch;
pub mod identity;
pub mod manager;
pub mod metrics;
pub mod publisher;
pub mod remote;
pub mod schema;

/// Query parameter carrying the access credential.
pub const API_KEY_PARAM: &str = "key";

pub use cache::ProfileCache;
pub use config::{ManagerConfig, SchemaVersion, DEFAULT_WORKER_THREADS};
pub use error::ManagerError;
pub use identity::IdentityMap;
pub use manager::{ProfileManager, ProfileManagerBuilder, RequestOutcome};
pub use publisher::{ProfileObserver, Publisher, SubscriptionId};
pub use remote::{HttpRemoteSource, RemoteRequest, RemoteSource};
pub use schema::{Schema, V1Schema, V2Schema};

pub use influence_types::{
    DecodeError, Detail, Direction, FetchError, Key, ProfileRecord, Query, RelatedProfile,
    RemoteError, Slice, SliceData, Summary, Topic,
};
