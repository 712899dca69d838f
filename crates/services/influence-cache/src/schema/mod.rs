//! Schema profiles: how each query maps onto the remote service.
//!
//! The two service generations expose different slices under different
//! addressing schemes. Both are described by the `Schema` trait so a single
//! manager can drive either.

use influence_types::{DecodeError, FetchError, Key, Query, SliceData};
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use crate::config::SchemaVersion;
use crate::remote::RemoteRequest;

mod v1;
mod v2;

pub use v1::V1Schema;
pub use v2::V2Schema;

/// Describes one generation of the remote service.
pub trait Schema: Send + Sync {
    fn version(&self) -> SchemaVersion;

    /// Service root used when the configuration does not override it.
    fn default_base_url(&self) -> &'static str;

    fn supports(&self, query: Query) -> bool;

    /// Whether slice requests are addressed by a service-internal ID that
    /// must be resolved from the key first.
    fn needs_identity(&self) -> bool {
        false
    }

    /// Request that resolves `key` to its service-internal ID.
    fn identity_request(&self, _key: &Key) -> Option<RemoteRequest> {
        None
    }

    fn decode_identity(&self, _doc: serde_json::Value) -> Result<String, DecodeError> {
        Err(DecodeError::MissingField("id"))
    }

    /// Build the request for `query`. `remote_id` is the resolved identity
    /// for schemas that need one.
    fn request(
        &self,
        key: &Key,
        remote_id: Option<&str>,
        query: Query,
    ) -> Result<RemoteRequest, FetchError>;

    /// Decode a whole response. Either every slice decodes or none is
    /// returned.
    fn decode(&self, query: Query, doc: serde_json::Value) -> Result<Vec<SliceData>, DecodeError>;
}

/// Schema implementation for a configured version.
pub fn for_version(version: SchemaVersion) -> Arc<dyn Schema> {
    match version {
        SchemaVersion::V1 => Arc::new(V1Schema),
        SchemaVersion::V2 => Arc::new(V2Schema),
    }
}

/// Accepts identifiers the service sends either as strings or as numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
