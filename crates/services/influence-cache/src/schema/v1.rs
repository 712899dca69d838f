use influence_types::{
    DecodeError, Detail, Direction, FetchError, Key, Query, RelatedProfile, SliceData, Summary,
    Topic,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::Schema;
use crate::config::SchemaVersion;
use crate::remote::RemoteRequest;

/// First-generation service: every endpoint takes the handle directly as
/// `users=<key>` and wraps its answer in a `users` array.
#[derive(Debug, Clone, Copy, Default)]
pub struct V1Schema;

#[derive(Deserialize)]
struct Users<T> {
    users: Vec<T>,
}

#[derive(Deserialize)]
struct ScoreUser {
    kscore: f64,
}

#[derive(Deserialize)]
struct TopicsUser {
    topics: Vec<String>,
}

#[derive(Deserialize)]
struct ShowUser {
    score: UserScore,
}

#[derive(Deserialize)]
struct UserScore {
    kscore: f64,
    slope: f64,
    description: String,
    kclass_id: i64,
    kclass: String,
    kclass_description: String,
    network_score: f64,
    amplification_score: f64,
    true_reach: f64,
    delta_1day: f64,
    delta_5day: f64,
}

#[derive(Deserialize)]
struct InfluenceUser {
    influencers: Option<Vec<Peer>>,
    influencees: Option<Vec<Peer>>,
}

#[derive(Deserialize)]
struct Peer {
    twitter_screen_name: String,
    kscore: f64,
}

fn first_user<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T, DecodeError> {
    let users: Users<T> = serde_json::from_value(doc)?;
    users
        .users
        .into_iter()
        .next()
        .ok_or(DecodeError::EmptyResult("users"))
}

impl Schema for V1Schema {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V1
    }

    fn default_base_url(&self) -> &'static str {
        "http://api.klout.com/1"
    }

    fn supports(&self, query: Query) -> bool {
        !matches!(query, Query::Influence)
    }

    fn request(
        &self,
        key: &Key,
        _remote_id: Option<&str>,
        query: Query,
    ) -> Result<RemoteRequest, FetchError> {
        let path = match query {
            Query::Score => "/klout.json",
            Query::Detail => "/users/show.json",
            Query::Topics => "/users/topics.json",
            Query::Related(Direction::InfluencedBy) => "/soi/influenced_by.json",
            Query::Related(Direction::InfluencerOf) => "/soi/influencer_of.json",
            Query::Influence => return Err(FetchError::Unsupported(query)),
        };
        Ok(RemoteRequest::new(path).param("users", key.as_str()))
    }

    fn decode(&self, query: Query, doc: serde_json::Value) -> Result<Vec<SliceData>, DecodeError> {
        let data = match query {
            Query::Score => {
                let user: ScoreUser = first_user(doc)?;
                SliceData::Summary(Summary::new(user.kscore))
            }
            Query::Detail => {
                let user: ShowUser = first_user(doc)?;
                let s = user.score;
                SliceData::Detail(Detail {
                    score: s.kscore,
                    slope: s.slope,
                    description: s.description,
                    class_id: s.kclass_id,
                    class_name: s.kclass,
                    class_description: s.kclass_description,
                    network: s.network_score,
                    amplification: s.amplification_score,
                    true_reach: s.true_reach,
                    one_day_delta: s.delta_1day,
                    five_day_delta: s.delta_5day,
                })
            }
            Query::Topics => {
                let user: TopicsUser = first_user(doc)?;
                SliceData::Topics(user.topics.into_iter().map(Topic::named).collect())
            }
            Query::Related(direction) => {
                let user: InfluenceUser = first_user(doc)?;
                let peers = match direction {
                    Direction::InfluencedBy => user
                        .influencers
                        .ok_or(DecodeError::MissingField("influencers"))?,
                    Direction::InfluencerOf => user
                        .influencees
                        .ok_or(DecodeError::MissingField("influencees"))?,
                };
                SliceData::Related {
                    direction,
                    entries: peers
                        .into_iter()
                        .map(|p| RelatedProfile::new(p.twitter_screen_name, p.kscore))
                        .collect(),
                }
            }
            Query::Influence => return Err(DecodeError::UnsupportedQuery(query)),
        };
        Ok(vec![data])
    }
}
