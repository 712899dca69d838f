//! Influence Types – data model for cached influence profiles.
//!
//! - `Key` identifies a profile (a user handle, used verbatim).
//! - `Slice` names one independently fetchable part of a profile and
//!   `Query` names what a single remote request returns.
//! - `ProfileRecord` is the partially-populated per-key aggregate.
//! - Error taxonomy for remote calls, decoding and fetch tasks.

#![forbid(unsafe_code)]

pub mod error;
pub mod profile;
pub mod query;

pub use error::{DecodeError, FetchError, RemoteError};
pub use profile::{
    Detail, Key, ProfileRecord, RelatedProfile, ScoreChanges, SliceData, Summary, Topic,
};
pub use query::{Direction, Query, Slice, UnknownQuery};
