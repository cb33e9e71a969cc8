//! Wire codec: application state <-> JSON text
//!
//! Plain structure serializes as usual. Every [`OrderedMap`] inside the value
//! is carried as a `{"kind":"Map","entries":[...]}` envelope and rebuilt on
//! decode, so integer keys and insertion order survive the round trip.

mod ordered_map;

pub use ordered_map::{MAP_TAG, OrderedMap};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{DecodeError, EncodeError};

/// Serialize a value to wire text
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(value)?)
}

/// Parse wire text back into a value
///
/// Malformed text is an error, never an empty default: a corrupt record
/// must stay visible to the caller.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        label: String,
        groups: OrderedMap<u32, OrderedMap<u64, String>>,
        tags: Vec<String>,
    }

    #[test]
    fn test_decode_malformed_text_fails() {
        let result: Result<OrderedMap<u64, String>, _> = decode("{not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_maps_survive() {
        let inner: OrderedMap<u64, String> =
            [(7, "seven".to_string()), (2, "two".to_string())].into_iter().collect();
        let mut groups = OrderedMap::new();
        groups.insert(1u32, inner);
        let value = Nested {
            label: "work".to_string(),
            groups,
            tags: vec!["a".to_string()],
        };

        let text = encode(&value).unwrap();
        assert!(text.contains(r#""groups":{"kind":"Map","entries":[[1,{"kind":"Map""#));

        let back: Nested = decode(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_plain_objects_untouched() {
        let text = encode(&vec![1, 2, 3]).unwrap();
        assert_eq!(text, "[1,2,3]");
        let back: Vec<i32> = decode(&text).unwrap();
        assert_eq!(back, vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prop_map_round_trip(entries in prop::collection::vec((any::<u64>(), ".{0,12}"), 0..32)) {
            let map: OrderedMap<u64, String> = entries.into_iter().collect();
            let back: OrderedMap<u64, String> = decode(&encode(&map).unwrap()).unwrap();

            prop_assert_eq!(back.len(), map.len());
            for (k, v) in map.iter() {
                prop_assert_eq!(back.get(k), Some(v));
            }
        }
    }
}
