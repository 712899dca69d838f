use influence_types::Key;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Handle → service-internal identifier, filled lazily and never evicted.
#[derive(Debug, Default)]
pub struct IdentityMap {
    ids: RwLock<HashMap<Key, String>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.ids.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ids.read().contains_key(key)
    }

    pub fn insert(&self, key: Key, remote_id: String) {
        self.ids.write().insert(key, remote_id);
    }

    /// Insert several mappings under one lock.
    pub fn extend<I>(&self, mappings: I)
    where
        I: IntoIterator<Item = (Key, String)>,
    {
        self.ids.write().extend(mappings);
    }

    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_are_reused_and_overwritten() {
        let map = IdentityMap::new();
        assert!(map.get("alice").is_none());

        map.insert(Key::from("alice"), "635263".into());
        map.extend(vec![(Key::from("bob"), "1".to_string()), (Key::from("alice"), "7".to_string())]);

        assert_eq!(map.get("alice").as_deref(), Some("7"));
        assert!(map.contains("bob"));
        assert_eq!(map.len(), 2);
    }
}
