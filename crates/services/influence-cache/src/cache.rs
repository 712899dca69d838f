use influence_types::{Key, ProfileRecord, Query, Slice, SliceData, Summary};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory store of profile records, one per key.
///
/// A single lock guards the whole map, so every merge (including the
/// cross-population of related profiles) is one critical section. Readers
/// only ever get clones; nothing outside the cache can mutate a record.
///
/// Records live for the lifetime of the cache. There is no eviction.
#[derive(Debug, Default)]
pub struct ProfileCache {
    records: RwLock<HashMap<Key, ProfileRecord>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the record for `key`, if any slice has been fetched.
    pub fn get(&self, key: &str) -> Option<ProfileRecord> {
        self.records.read().get(key).cloned()
    }

    /// Whether `slice` is populated for `key`. Presence alone counts as fresh.
    pub fn has_fresh(&self, key: &str, slice: Slice) -> bool {
        self.records
            .read()
            .get(key)
            .map(|record| record.has_slice(slice))
            .unwrap_or(false)
    }

    /// Whether every slice produced by `query` is populated for `key`.
    pub fn has_fresh_query(&self, key: &str, query: Query) -> bool {
        let records = self.records.read();
        match records.get(key) {
            Some(record) => query.slices().iter().all(|s| record.has_slice(*s)),
            None => false,
        }
    }

    /// Like `get`, but only when `query` is fully cached. Check and read
    /// happen under one lock.
    pub fn get_fresh(&self, key: &str, query: Query) -> Option<ProfileRecord> {
        let records = self.records.read();
        records
            .get(key)
            .filter(|record| query.slices().iter().all(|s| record.has_slice(*s)))
            .cloned()
    }

    /// Merge one decoded slice into the record for `key`, creating the record
    /// if needed. Returns the post-merge record.
    pub fn upsert(&self, key: &Key, data: SliceData) -> ProfileRecord {
        let mut records = self.records.write();
        Self::merge(&mut records, key, data)
    }

    /// Merge several slices decoded from one response, atomically.
    ///
    /// Returns `None` (and creates nothing) when `fields` is empty.
    pub fn upsert_all(&self, key: &Key, fields: Vec<SliceData>) -> Option<ProfileRecord> {
        if fields.is_empty() {
            return None;
        }
        let mut records = self.records.write();
        let mut merged = None;
        for data in fields {
            merged = Some(Self::merge(&mut records, key, data));
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.records.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn merge(records: &mut HashMap<Key, ProfileRecord>, key: &Key, data: SliceData) -> ProfileRecord {
        // Related entries become first-class records in the same critical
        // section as the owning list. A list entry only carries a score, so
        // deltas from an earlier direct fetch are kept.
        if let SliceData::Related { entries, .. } = &data {
            for entry in entries {
                let related = records
                    .entry(entry.key.clone())
                    .or_insert_with(|| ProfileRecord::new(entry.key.clone()));
                let changes = related.summary().and_then(|s| s.changes);
                related.apply(SliceData::Summary(Summary {
                    score: entry.score,
                    changes,
                }));
            }
        }

        let record = records
            .entry(key.clone())
            .or_insert_with(|| ProfileRecord::new(key.clone()));
        record.apply(data);
        record.clone()
    }
}
