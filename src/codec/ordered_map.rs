//! Insertion-ordered key/value map with a tagged wire form
//!
//! JSON has no native map with non-string keys, so the map serializes as
//! `{"kind":"Map","entries":[[key, value], ...]}`. Integer keys stay integers.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

/// Tag value identifying a map envelope on the wire
pub const MAP_TAG: &str = "Map";

/// Ordered key/value mapping with unique keys
///
/// Iteration follows insertion order. Replacing an existing key keeps its
/// position; removal shifts later entries down.
#[derive(Clone, PartialEq, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace. Returns the previous value if the key existed.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for OrderedMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Serialize, V: Serialize> Serialize for OrderedMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_struct("Map", 2)?;
        envelope.serialize_field("kind", MAP_TAG)?;
        envelope.serialize_field("entries", &self.entries)?;
        envelope.end()
    }
}

/// Accepted envelope shapes. `Legacy` is the `{"type":"Map","value":[...]}`
/// form written by earlier releases of the web app.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<K, V> {
    Current {
        kind: String,
        entries: Vec<(K, V)>,
    },
    Legacy {
        #[serde(rename = "type")]
        tag: String,
        value: Vec<(K, V)>,
    },
}

impl<'de, K, V> Deserialize<'de> for OrderedMap<K, V>
where
    K: Deserialize<'de> + PartialEq,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, entries) = match Envelope::<K, V>::deserialize(deserializer)? {
            Envelope::Current { kind, entries } => (kind, entries),
            Envelope::Legacy { tag, value } => (tag, value),
        };
        if tag != MAP_TAG {
            return Err(de::Error::invalid_value(
                de::Unexpected::Str(&tag),
                &"a map envelope tagged \"Map\"",
            ));
        }
        // Later duplicates overwrite earlier ones, keeping the first position
        Ok(entries.into_iter().collect())
    }
}
