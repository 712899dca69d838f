use influence_types::{Query, RemoteError};
use thiserror::Error;

use crate::config::SchemaVersion;

/// Errors raised synchronously by the manager itself.
///
/// Remote failures never show up here; they are reported through the
/// observers' error channel once the fetch task has given up.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("query {query} is not offered by the {schema} service")]
    Unsupported { query: Query, schema: SchemaVersion },

    #[error("no tokio runtime available to run fetch tasks")]
    NoRuntime,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to set up remote source: {0}")]
    Client(#[from] RemoteError),
}
