//! Serde support for `Arc`-shared subtrees.
//!
//! Plans share unchanged subtrees behind `Arc`; serialization flattens the
//! sharing and deserialization re-allocates. The top-level pair is the
//! standard serde passthrough boilerplate for an `Arc<T>` field, kept here
//! once so every `#[serde(with = "serde_arc")]` annotation reads the same;
//! [`map`] extends the passthrough to the CTE map's `HashMap<String, Arc<T>>`
//! values (`#[serde(with = "serde_arc::map")]`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn serialize<S, T>(val: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: Serialize,
{
    T::serialize(val.as_ref(), serializer)
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Arc<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Arc::new)
}

/// `HashMap<String, Arc<T>>` variant of the passthrough above.
pub mod map {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;
    use std::sync::Arc;

    pub fn serialize<S, T>(
        val: &HashMap<String, Arc<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: Serialize,
    {
        let mut map = serializer.serialize_map(Some(val.len()))?;
        for (key, value) in val {
            map.serialize_entry(key, value.as_ref())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<HashMap<String, Arc<T>>, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let entries = HashMap::<String, T>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect())
    }
}
