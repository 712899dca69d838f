use thiserror::Error;

use crate::profile::Key;
use crate::query::Query;

/// Failure reported by a remote data source.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is not a JSON document: {0}")]
    Malformed(String),
}

/// A response document that does not match the schema of its query.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("schema mismatch: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response contained no {0}")]
    EmptyResult(&'static str),

    #[error("response is missing field \"{0}\"")]
    MissingField(&'static str),

    #[error("no decoder for query {0}")]
    UnsupportedQuery(Query),
}

/// Why a fetch task ended without updating the cache.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("undecodable response: {0}")]
    Decode(#[from] DecodeError),

    #[error("no identifier mapping could be resolved for \"{0}\"")]
    MissingIdentity(Key),

    #[error("query {0} is not offered by this service")]
    Unsupported(Query),
}

impl FetchError {
    /// Stable short label, used for metrics and log fields.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Remote(RemoteError::Transport(_)) => "transport",
            FetchError::Remote(RemoteError::Status { .. }) => "status",
            FetchError::Remote(RemoteError::Malformed(_)) => "malformed",
            FetchError::Decode(_) => "decode",
            FetchError::MissingIdentity(_) => "missing_identity",
            FetchError::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_follow_the_taxonomy() {
        let status = FetchError::from(RemoteError::Status {
            status: 503,
            body: "busy".into(),
        });
        assert_eq!(status.reason(), "status");
        assert_eq!(
            status.to_string(),
            "remote server responded with status 503: busy"
        );

        let decode = FetchError::from(DecodeError::EmptyResult("users"));
        assert_eq!(decode.reason(), "decode");

        let missing = FetchError::MissingIdentity(Key::from("ghost"));
        assert_eq!(missing.reason(), "missing_identity");
        assert!(missing.to_string().contains("ghost"));
    }
}
