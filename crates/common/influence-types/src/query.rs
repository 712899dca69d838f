use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// One independently fetchable category of profile data.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Slice {
    Summary,
    Detail,
    Topics,
    InfluencedBy,
    InfluencerOf,
}

/// Direction of a related-profile list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Profiles that influence the subject.
    InfluencedBy,
    /// Profiles the subject influences.
    InfluencerOf,
}

impl Direction {
    pub fn slice(self) -> Slice {
        match self {
            Direction::InfluencedBy => Slice::InfluencedBy,
            Direction::InfluencerOf => Slice::InfluencerOf,
        }
    }
}

/// What a single remote request asks for.
///
/// Most queries fill exactly one slice; `Influence` returns both related
/// directions in one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    Score,
    Detail,
    Topics,
    Related(Direction),
    Influence,
}

impl Query {
    /// Slices populated by a successful response to this query.
    pub fn slices(self) -> &'static [Slice] {
        match self {
            Query::Score => &[Slice::Summary],
            Query::Detail => &[Slice::Detail],
            Query::Topics => &[Slice::Topics],
            Query::Related(Direction::InfluencedBy) => &[Slice::InfluencedBy],
            Query::Related(Direction::InfluencerOf) => &[Slice::InfluencerOf],
            Query::Influence => &[Slice::InfluencedBy, Slice::InfluencerOf],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Query::Score => "score",
            Query::Detail => "detail",
            Query::Topics => "topics",
            Query::Related(Direction::InfluencedBy) => "influenced_by",
            Query::Related(Direction::InfluencerOf) => "influencer_of",
            Query::Influence => "influence",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a query name is not recognised.
#[derive(Debug, thiserror::Error)]
#[error("unknown query \"{0}\"")]
pub struct UnknownQuery(pub String);

impl FromStr for Query {
    type Err = UnknownQuery;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score" => Ok(Query::Score),
            // "user" is what the service itself calls the detailed breakdown
            "detail" | "user" => Ok(Query::Detail),
            "topics" => Ok(Query::Topics),
            "influenced_by" => Ok(Query::Related(Direction::InfluencedBy)),
            "influencer_of" => Ok(Query::Related(Direction::InfluencerOf)),
            "influence" => Ok(Query::Influence),
            other => Err(UnknownQuery(other.to_string())),
        }
    }
}
