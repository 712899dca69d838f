use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::query::{Direction, Slice};

/// External identifier of a profile (a user handle).
///
/// Used verbatim as the cache key; no case folding or trimming is applied.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Short-term movement of a score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreChanges {
    pub day: f64,
    pub week: f64,
    pub month: f64,
}

/// The `Summary` slice: the headline score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub score: f64,
    /// Only reported by services that track score deltas.
    pub changes: Option<ScoreChanges>,
}

impl Summary {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            changes: None,
        }
    }
}

/// The `Detail` slice: score breakdown, class and deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detail {
    pub score: f64,
    /// Slope of the score graph.
    pub slope: f64,
    pub description: String,
    pub class_id: i64,
    pub class_name: String,
    pub class_description: String,
    pub network: f64,
    pub amplification: f64,
    pub true_reach: f64,
    pub one_day_delta: f64,
    pub five_day_delta: f64,
}

/// A topic a profile is influential about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub display_name: Option<String>,
    pub id: Option<u64>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
}

impl Topic {
    /// A topic known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            id: None,
            slug: None,
            image_url: None,
        }
    }
}

/// Minimal record for a profile listed in an influence graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedProfile {
    pub key: Key,
    pub score: f64,
    /// Service-internal identifier, when the service reports one.
    pub remote_id: Option<String>,
}

impl RelatedProfile {
    pub fn new(key: impl Into<Key>, score: f64) -> Self {
        Self {
            key: key.into(),
            score,
            remote_id: None,
        }
    }
}

/// Fully decoded fields for one slice, ready to be merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SliceData {
    Summary(Summary),
    Detail(Detail),
    Topics(Vec<Topic>),
    Related {
        direction: Direction,
        entries: Vec<RelatedProfile>,
    },
}

impl SliceData {
    pub fn slice(&self) -> Slice {
        match self {
            SliceData::Summary(_) => Slice::Summary,
            SliceData::Detail(_) => Slice::Detail,
            SliceData::Topics(_) => Slice::Topics,
            SliceData::Related { direction, .. } => direction.slice(),
        }
    }
}

/// Everything fetched so far for one key.
///
/// Each slice is `None` until its first successful fetch. Applying one slice
/// never touches another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    key: Key,
    summary: Option<Summary>,
    detail: Option<Detail>,
    topics: Option<Vec<Topic>>,
    influenced_by: Option<Vec<RelatedProfile>>,
    influencer_of: Option<Vec<RelatedProfile>>,
}

impl ProfileRecord {
    /// An empty record. Callers holding records in a cache must apply at
    /// least one slice before publishing it.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            summary: None,
            detail: None,
            topics: None,
            influenced_by: None,
            influencer_of: None,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The headline score: the `Summary` slice if fetched, otherwise the
    /// score reported with the `Detail` slice.
    pub fn score(&self) -> Option<f64> {
        self.summary
            .as_ref()
            .map(|s| s.score)
            .or_else(|| self.detail.as_ref().map(|d| d.score))
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }

    pub fn topics(&self) -> Option<&[Topic]> {
        self.topics.as_deref()
    }

    pub fn topic_names(&self) -> Option<Vec<&str>> {
        self.topics
            .as_ref()
            .map(|topics| topics.iter().map(|t| t.name.as_str()).collect())
    }

    pub fn influenced_by(&self) -> Option<&[RelatedProfile]> {
        self.influenced_by.as_deref()
    }

    pub fn influencer_of(&self) -> Option<&[RelatedProfile]> {
        self.influencer_of.as_deref()
    }

    pub fn related(&self, direction: Direction) -> Option<&[RelatedProfile]> {
        match direction {
            Direction::InfluencedBy => self.influenced_by(),
            Direction::InfluencerOf => self.influencer_of(),
        }
    }

    pub fn has_slice(&self, slice: Slice) -> bool {
        match slice {
            Slice::Summary => self.summary.is_some(),
            Slice::Detail => self.detail.is_some(),
            Slice::Topics => self.topics.is_some(),
            Slice::InfluencedBy => self.influenced_by.is_some(),
            Slice::InfluencerOf => self.influencer_of.is_some(),
        }
    }

    /// Populated slices, in declaration order.
    pub fn slices(&self) -> Vec<Slice> {
        [
            Slice::Summary,
            Slice::Detail,
            Slice::Topics,
            Slice::InfluencedBy,
            Slice::InfluencerOf,
        ]
        .into_iter()
        .filter(|s| self.has_slice(*s))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slices().is_empty()
    }

    /// Replace one slice wholesale, leaving every other slice as it was.
    pub fn apply(&mut self, data: SliceData) {
        match data {
            SliceData::Summary(summary) => self.summary = Some(summary),
            SliceData::Detail(detail) => self.detail = Some(detail),
            SliceData::Topics(topics) => self.topics = Some(topics),
            SliceData::Related {
                direction: Direction::InfluencedBy,
                entries,
            } => self.influenced_by = Some(entries),
            SliceData::Related {
                direction: Direction::InfluencerOf,
                entries,
            } => self.influencer_of = Some(entries),
        }
    }
}

impl fmt::Display for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(score) = self.score() {
            write!(f, " score={:.2}", score)?;
        }
        if let Some(changes) = self.summary.as_ref().and_then(|s| s.changes) {
            write!(
                f,
                " change(d/w/m)={:+.2}/{:+.2}/{:+.2}",
                changes.day, changes.week, changes.month
            )?;
        }
        if let Some(detail) = &self.detail {
            write!(
                f,
                " class=\"{}\" network={:.2} amplification={:.2} true_reach={:.2}",
                detail.class_name, detail.network, detail.amplification, detail.true_reach
            )?;
        }
        if let Some(names) = self.topic_names() {
            write!(f, " topics=[{}]", names.join(", "))?;
        }
        for direction in [Direction::InfluencedBy, Direction::InfluencerOf] {
            if let Some(entries) = self.related(direction) {
                let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
                write!(f, " {}=[{}]", direction, keys.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(score: f64) -> Detail {
        Detail {
            score,
            slope: 0.3,
            description: "posts a lot".into(),
            class_id: 4,
            class_name: "Networker".into(),
            class_description: "connects people".into(),
            network: 40.0,
            amplification: 20.0,
            true_reach: 300.0,
            one_day_delta: 0.1,
            five_day_delta: -0.4,
        }
    }

    #[test]
    fn applying_a_slice_leaves_others_untouched() {
        let mut record = ProfileRecord::new(Key::from("alice"));
        record.apply(SliceData::Detail(detail(55.2)));
        record.apply(SliceData::Topics(vec![Topic::named("technology")]));

        assert_eq!(record.score(), Some(55.2));
        assert_eq!(record.topic_names(), Some(vec!["technology"]));
        assert_eq!(record.slices(), vec![Slice::Detail, Slice::Topics]);
    }

    #[test]
    fn summary_score_takes_precedence_over_detail() {
        let mut record = ProfileRecord::new(Key::from("bob"));
        record.apply(SliceData::Detail(detail(10.0)));
        record.apply(SliceData::Summary(Summary::new(12.5)));
        assert_eq!(record.score(), Some(12.5));
    }

    #[test]
    fn related_directions_are_independent() {
        let mut record = ProfileRecord::new(Key::from("carol"));
        record.apply(SliceData::Related {
            direction: Direction::InfluencedBy,
            entries: vec![RelatedProfile::new("dave", 33.0)],
        });
        assert!(record.has_slice(Slice::InfluencedBy));
        assert!(!record.has_slice(Slice::InfluencerOf));
        assert!(record.related(Direction::InfluencerOf).is_none());

        record.apply(SliceData::Related {
            direction: Direction::InfluencerOf,
            entries: vec![],
        });
        assert_eq!(record.influenced_by().map(|e| e.len()), Some(1));
        assert_eq!(record.influencer_of().map(|e| e.len()), Some(0));
    }

    #[test]
    fn new_record_is_empty() {
        let record = ProfileRecord::new(Key::from("erin"));
        assert!(record.is_empty());
        assert_eq!(record.score(), None);
    }
}
