use influence_types::{
    DecodeError, Direction, FetchError, Key, Query, RelatedProfile, ScoreChanges, SliceData,
    Summary, Topic,
};
use serde::Deserialize;

use super::{string_or_number, Schema};
use crate::config::SchemaVersion;
use crate::remote::RemoteRequest;

/// Second-generation service: profiles are addressed by a service-internal
/// ID, looked up once per handle through the identity endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct V2Schema;

#[derive(Deserialize)]
struct Identity {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreDoc {
    score: f64,
    score_delta: ScoreDelta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreDelta {
    day_change: f64,
    week_change: f64,
    month_change: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicDoc {
    id: u64,
    name: String,
    display_name: String,
    slug: String,
    image_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InfluenceDoc {
    my_influencers: Vec<InfluenceEntry>,
    my_influencees: Vec<InfluenceEntry>,
}

#[derive(Deserialize)]
struct InfluenceEntry {
    entity: Entity,
}

#[derive(Deserialize)]
struct Entity {
    payload: Payload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(deserialize_with = "string_or_number")]
    klout_id: String,
    nick: String,
    score: PayloadScore,
}

#[derive(Deserialize)]
struct PayloadScore {
    score: f64,
}

impl From<InfluenceEntry> for RelatedProfile {
    fn from(entry: InfluenceEntry) -> Self {
        let payload = entry.entity.payload;
        RelatedProfile {
            key: Key::new(payload.nick),
            score: payload.score.score,
            remote_id: Some(payload.klout_id),
        }
    }
}

impl Schema for V2Schema {
    fn version(&self) -> SchemaVersion {
        SchemaVersion::V2
    }

    fn default_base_url(&self) -> &'static str {
        "http://api.klout.com/v2"
    }

    fn supports(&self, query: Query) -> bool {
        matches!(query, Query::Score | Query::Topics | Query::Influence)
    }

    fn needs_identity(&self) -> bool {
        true
    }

    fn identity_request(&self, key: &Key) -> Option<RemoteRequest> {
        Some(RemoteRequest::new("/identity.json/twitter").param("screenName", key.as_str()))
    }

    fn decode_identity(&self, doc: serde_json::Value) -> Result<String, DecodeError> {
        let identity: Identity = serde_json::from_value(doc)?;
        Ok(identity.id)
    }

    fn request(
        &self,
        key: &Key,
        remote_id: Option<&str>,
        query: Query,
    ) -> Result<RemoteRequest, FetchError> {
        let endpoint = match query {
            Query::Score => "score",
            Query::Topics => "topics",
            Query::Influence => "influence",
            Query::Detail | Query::Related(_) => return Err(FetchError::Unsupported(query)),
        };
        let id = remote_id.ok_or_else(|| FetchError::MissingIdentity(key.clone()))?;
        Ok(RemoteRequest::new(format!("/user.json/{}/{}", id, endpoint)))
    }

    fn decode(&self, query: Query, doc: serde_json::Value) -> Result<Vec<SliceData>, DecodeError> {
        match query {
            Query::Score => {
                let score: ScoreDoc = serde_json::from_value(doc)?;
                Ok(vec![SliceData::Summary(Summary {
                    score: score.score,
                    changes: Some(ScoreChanges {
                        day: score.score_delta.day_change,
                        week: score.score_delta.week_change,
                        month: score.score_delta.month_change,
                    }),
                })])
            }
            Query::Topics => {
                let topics: Vec<TopicDoc> = serde_json::from_value(doc)?;
                Ok(vec![SliceData::Topics(
                    topics
                        .into_iter()
                        .map(|t| Topic {
                            name: t.name,
                            display_name: Some(t.display_name),
                            id: Some(t.id),
                            slug: Some(t.slug),
                            image_url: Some(t.image_url),
                        })
                        .collect(),
                )])
            }
            Query::Influence => {
                let influence: InfluenceDoc = serde_json::from_value(doc)?;
                Ok(vec![
                    SliceData::Related {
                        direction: Direction::InfluencedBy,
                        entries: influence.my_influencers.into_iter().map(Into::into).collect(),
                    },
                    SliceData::Related {
                        direction: Direction::InfluencerOf,
                        entries: influence.my_influencees.into_iter().map(Into::into).collect(),
                    },
                ])
            }
            Query::Detail | Query::Related(_) => Err(DecodeError::UnsupportedQuery(query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: serde_json::Value, nick: &str, score: f64) -> serde_json::Value {
        json!({"entity": {"id": id.clone(), "payload": {"kloutId": id, "nick": nick, "score": {"score": score, "bucket": "50-59"}}}})
    }

    #[test]
    fn slice_requests_need_a_resolved_identity() {
        let key = Key::from("alice");
        assert!(matches!(
            V2Schema.request(&key, None, Query::Score),
            Err(FetchError::MissingIdentity(k)) if k == key
        ));

        let request = V2Schema.request(&key, Some("635263"), Query::Influence).unwrap();
        assert_eq!(request.path, "/user.json/635263/influence");

        let identity = V2Schema.identity_request(&key).unwrap();
        assert_eq!(identity.path, "/identity.json/twitter");
        assert_eq!(identity.get_param("screenName"), Some("alice"));
    }

    #[test]
    fn handle_only_queries_have_no_decoder() {
        let doc = json!({"users": [{"score": {"kscore": 55.2}}]});
        assert!(matches!(
            V2Schema.decode(Query::Detail, doc),
            Err(DecodeError::UnsupportedQuery(Query::Detail))
        ));
        assert!(matches!(
            V2Schema.decode(Query::Related(Direction::InfluencedBy), json!({})),
            Err(DecodeError::UnsupportedQuery(Query::Related(Direction::InfluencedBy)))
        ));
    }

    #[test]
    fn identity_accepts_string_or_numeric_ids() {
        assert_eq!(
            V2Schema.decode_identity(json!({"id": "635263", "network": "ks"})).unwrap(),
            "635263"
        );
        assert_eq!(V2Schema.decode_identity(json!({"id": 42})).unwrap(), "42");
        assert!(V2Schema.decode_identity(json!({"network": "ks"})).is_err());
    }

    #[test]
    fn decodes_score_with_deltas() {
        let doc = json!({"score": 55.2, "scoreDelta": {"dayChange": 0.1, "weekChange": -0.4, "monthChange": 2.0}});
        let fields = V2Schema.decode(Query::Score, doc).unwrap();
        assert_eq!(
            fields,
            vec![SliceData::Summary(Summary {
                score: 55.2,
                changes: Some(ScoreChanges { day: 0.1, week: -0.4, month: 2.0 }),
            })]
        );
    }

    #[test]
    fn decodes_full_topics() {
        let doc = json!([{"id": 9, "name": "technology", "displayName": "Technology",
            "slug": "technology", "imageUrl": "http://img/tech.png"}]);
        let fields = V2Schema.decode(Query::Topics, doc).unwrap();
        match &fields[..] {
            [SliceData::Topics(topics)] => {
                assert_eq!(topics[0].name, "technology");
                assert_eq!(topics[0].display_name.as_deref(), Some("Technology"));
                assert_eq!(topics[0].id, Some(9));
            }
            other => panic!("unexpected fields: {:?}", other),
        }
    }

    #[test]
    fn influence_yields_both_directions() {
        let doc = json!({
            "myInfluencers": [entry(json!("11"), "bob", 61.0)],
            "myInfluencees": [entry(json!(12), "carol", 12.5), entry(json!("13"), "dave", 40.0)],
            "myInfluencersCount": 1,
            "myInfluenceesCount": 2
        });
        let fields = V2Schema.decode(Query::Influence, doc).unwrap();
        assert_eq!(fields.len(), 2);
        match &fields[1] {
            SliceData::Related { direction, entries } => {
                assert_eq!(*direction, Direction::InfluencerOf);
                assert_eq!(entries[0].key, Key::from("carol"));
                assert_eq!(entries[0].remote_id.as_deref(), Some("12"));
                assert_eq!(entries[1].score, 40.0);
            }
            other => panic!("unexpected slice: {:?}", other),
        }
    }

    #[test]
    fn missing_influence_list_fails_the_whole_response() {
        let doc = json!({"myInfluencers": [entry(json!("11"), "bob", 61.0)]});
        assert!(V2Schema.decode(Query::Influence, doc).is_err());
    }
}
