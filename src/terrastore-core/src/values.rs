//! Ordered `key -> document` collections returned by multi-document queries.

use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::codec::CodecRegistry;

/// Documents keyed by their document key, in the order the server sent them
#[derive(Debug, Clone, PartialEq)]
pub struct Values<T> {
    entries: Vec<(String, T)>,
    index: HashMap<String, usize>,
}

impl<T> Values<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert a value; an existing key keeps its position and gets the new value
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T> Default for Values<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for Values<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut values = Values::with_capacity(iter.size_hint().0);
        for (key, value) in iter {
            values.insert(key, value);
        }
        values
    }
}

impl<T> IntoIterator for Values<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Serialize> Serialize for Values<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, T> Deserialize<'de> for Values<T>
where
    T: DeserializeOwned + 'static,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValuesSeed {
            registry: None,
            marker: PhantomData,
        }
        .deserialize(deserializer)
    }
}

/// Decodes a JSON object field by field, mapping each value through a registry
pub struct ValuesSeed<'a, T> {
    registry: Option<&'a CodecRegistry>,
    marker: PhantomData<T>,
}

impl<'a, T> ValuesSeed<'a, T> {
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self {
            registry: Some(registry),
            marker: PhantomData,
        }
    }
}

impl<'de, 'a, T> DeserializeSeed<'de> for ValuesSeed<'a, T>
where
    T: DeserializeOwned + 'static,
{
    type Value = Values<T>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Values<T>, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de, 'a, T> Visitor<'de> for ValuesSeed<'a, T>
where
    T: DeserializeOwned + 'static,
{
    type Value = Values<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object of documents keyed by document key")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Values<T>, A::Error> {
        let mut values = Values::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let raw: serde_json::Value = map.next_value()?;
            let value = match self.registry {
                Some(registry) => registry.decode(raw).map_err(de::Error::custom)?,
                None => serde_json::from_value(raw).map_err(de::Error::custom)?,
            };
            values.insert(key, value);
        }
        Ok(values)
    }
}
