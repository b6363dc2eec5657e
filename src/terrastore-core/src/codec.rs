use serde::de::{DeserializeOwned, DeserializeSeed};
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::values::{Values, ValuesSeed};

/// Errors raised while mapping values to and from JSON
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{type_name} cannot be encoded")]
    Unsupported { type_name: &'static str },

    #[error("invalid {type_name}: {message}")]
    Invalid {
        type_name: &'static str,
        message: String,
    },
}

impl CodecError {
    pub fn invalid<T>(message: impl Into<String>) -> Self {
        CodecError::Invalid {
            type_name: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    pub fn unsupported<T>() -> Self {
        CodecError::Unsupported {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// Custom JSON mapping for one exact Rust type.
///
/// Registered descriptors take precedence over the type's own serde
/// implementation whenever the registry encodes or decodes that type.
pub trait JsonObjectDescriptor<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Value, CodecError>;

    fn decode(&self, value: Value) -> Result<T, CodecError>;
}

/// Type-keyed lookup of custom descriptors with serde as the fallback.
///
/// `encode`/`decode` need serde impls on `T` for the fallback path even when a
/// descriptor is registered; types mapped only by a descriptor go through
/// `encode_registered`/`decode_registered` instead.
///
/// Built once when the client is constructed; there is no way to register
/// or replace a descriptor after the registry has been shared.
#[derive(Default)]
pub struct CodecRegistry {
    descriptors: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor for `T`, replacing any earlier one for the same type
    pub fn register<T, D>(mut self, descriptor: D) -> Self
    where
        T: 'static,
        D: JsonObjectDescriptor<T> + 'static,
    {
        let descriptor: Arc<dyn JsonObjectDescriptor<T>> = Arc::new(descriptor);
        tracing::debug!("Registered JSON descriptor for {}", std::any::type_name::<T>());
        self.descriptors.insert(TypeId::of::<T>(), Box::new(descriptor));
        self
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    fn descriptor<T: 'static>(&self) -> Option<&Arc<dyn JsonObjectDescriptor<T>>> {
        self.descriptors
            .get(&TypeId::of::<T>())
            .and_then(|d| d.downcast_ref::<Arc<dyn JsonObjectDescriptor<T>>>())
    }

    /// Encode through the registered descriptor only
    pub fn encode_registered<T: 'static>(&self, value: &T) -> Result<Value, CodecError> {
        match self.descriptor::<T>() {
            Some(descriptor) => descriptor.encode(value),
            None => Err(CodecError::unsupported::<T>()),
        }
    }

    /// Decode through the registered descriptor only
    pub fn decode_registered<T: 'static>(&self, value: Value) -> Result<T, CodecError> {
        match self.descriptor::<T>() {
            Some(descriptor) => descriptor.decode(value),
            None => Err(CodecError::unsupported::<T>()),
        }
    }

    pub fn encode<T>(&self, value: &T) -> Result<Value, CodecError>
    where
        T: Serialize + 'static,
    {
        match self.descriptor::<T>() {
            Some(descriptor) => descriptor.encode(value),
            None => Ok(serde_json::to_value(value)?),
        }
    }

    pub fn encode_to_vec<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + 'static,
    {
        let value = self.encode(value)?;
        Ok(serde_json::to_vec(&value)?)
    }

    pub fn decode<T>(&self, value: Value) -> Result<T, CodecError>
    where
        T: DeserializeOwned + 'static,
    {
        match self.descriptor::<T>() {
            Some(descriptor) => descriptor.decode(value),
            None => Ok(serde_json::from_value(value)?),
        }
    }

    pub fn decode_slice<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned + 'static,
    {
        match self.descriptor::<T>() {
            Some(descriptor) => descriptor.decode(serde_json::from_slice(bytes)?),
            None => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Encode every entry through the registry, keeping collection order
    pub fn encode_values<T>(&self, values: &Values<T>) -> Result<Values<Value>, CodecError>
    where
        T: Serialize + 'static,
    {
        values
            .iter()
            .map(|(key, value)| -> Result<(String, Value), CodecError> {
                Ok((key.to_string(), self.encode(value)?))
            })
            .collect()
    }

    /// Decode a JSON object of `key -> document` into an ordered collection
    pub fn decode_values<T>(&self, bytes: &[u8]) -> Result<Values<T>, CodecError>
    where
        T: DeserializeOwned + 'static,
    {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let values = ValuesSeed::new(self).deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(values)
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestValue {
        value: String,
    }

    /// Stores `TestValue` under a `key` field instead of `value`
    struct TestValueDescriptor;

    impl JsonObjectDescriptor<TestValue> for TestValueDescriptor {
        fn encode(&self, value: &TestValue) -> Result<Value, CodecError> {
            Ok(json!({ "key": value.value }))
        }

        fn decode(&self, value: Value) -> Result<TestValue, CodecError> {
            match value.get("key").and_then(Value::as_str) {
                Some(key) => Ok(TestValue {
                    value: format!("custom:{}", key),
                }),
                None => Err(CodecError::invalid::<TestValue>("missing key field")),
            }
        }
    }

    #[test]
    fn test_unregistered_type_uses_serde() {
        let registry = CodecRegistry::new();
        let value = TestValue {
            value: "plain".to_string(),
        };

        let encoded = registry.encode(&value).unwrap();
        assert_eq!(encoded, json!({ "value": "plain" }));

        let decoded: TestValue = registry.decode(encoded).unwrap();
        assert_eq!(decoded, value);
        assert!(!registry.is_registered::<TestValue>());
    }

    #[test]
    fn test_registered_descriptor_takes_precedence() {
        let registry = CodecRegistry::new().register(TestValueDescriptor);
        assert!(registry.is_registered::<TestValue>());

        // Both shapes would decode structurally; the descriptor must win
        let body = br#"{"key": "k", "value": "v"}"#;
        let decoded: TestValue = registry.decode_slice(body).unwrap();
        assert_eq!(decoded.value, "custom:k");

        let encoded = registry
            .encode(&TestValue {
                value: "v".to_string(),
            })
            .unwrap();
        assert_eq!(encoded, json!({ "key": "v" }));
    }

    #[test]
    fn test_descriptor_is_exact_type_only() {
        let registry = CodecRegistry::new().register(TestValueDescriptor);

        // Vec<TestValue> is a different type and maps structurally
        let decoded: Vec<TestValue> = registry
            .decode(json!([{ "value": "a" }]))
            .unwrap();
        assert_eq!(decoded[0].value, "a");
    }

    #[test]
    fn test_descriptor_errors_propagate() {
        let registry = CodecRegistry::new().register(TestValueDescriptor);
        let result: Result<TestValue, _> = registry.decode(json!({ "value": "v" }));
        assert!(matches!(result, Err(CodecError::Invalid { .. })));
    }

    #[test]
    fn test_decode_values_uses_registry_per_entry() {
        let registry = CodecRegistry::new().register(TestValueDescriptor);
        let values: Values<TestValue> = registry
            .decode_values(br#"{"b": {"key": "1"}, "a": {"key": "2"}}"#)
            .unwrap();

        let keys: Vec<&str> = values.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(values.get("a").unwrap().value, "custom:2");
    }

    #[test]
    fn test_encode_values_keeps_order() {
        let registry = CodecRegistry::new().register(TestValueDescriptor);
        let mut values = Values::new();
        values.insert(
            "z",
            TestValue {
                value: "1".to_string(),
            },
        );
        values.insert(
            "a",
            TestValue {
                value: "2".to_string(),
            },
        );

        let encoded = registry.encode_values(&values).unwrap();
        let body = serde_json::to_string(&encoded).unwrap();
        assert_eq!(body, r#"{"z":{"key":"1"},"a":{"key":"2"}}"#);
    }

    /// No serde impls; only reachable through a descriptor
    #[derive(Debug, PartialEq)]
    struct Point(i64, i64);

    struct PointDescriptor;

    impl JsonObjectDescriptor<Point> for PointDescriptor {
        fn encode(&self, value: &Point) -> Result<Value, CodecError> {
            Ok(json!([value.0, value.1]))
        }

        fn decode(&self, value: Value) -> Result<Point, CodecError> {
            match value.as_array().map(Vec::as_slice) {
                Some([x, y]) => match (x.as_i64(), y.as_i64()) {
                    (Some(x), Some(y)) => Ok(Point(x, y)),
                    _ => Err(CodecError::invalid::<Point>("coordinates must be integers")),
                },
                _ => Err(CodecError::invalid::<Point>("expected [x, y]")),
            }
        }
    }

    #[test]
    fn test_descriptor_only_type_round_trips() {
        let registry = CodecRegistry::new().register(PointDescriptor);

        let encoded = registry.encode_registered(&Point(3, -4)).unwrap();
        assert_eq!(encoded, json!([3, -4]));

        let decoded: Point = registry.decode_registered(json!([1, 2])).unwrap();
        assert_eq!(decoded, Point(1, 2));
    }

    #[test]
    fn test_descriptor_only_entry_points_require_registration() {
        let registry = CodecRegistry::new();
        assert!(matches!(
            registry.encode_registered(&Point(0, 0)),
            Err(CodecError::Unsupported { .. })
        ));
        let result: Result<Point, _> = registry.decode_registered(json!([0, 0]));
        assert!(matches!(result, Err(CodecError::Unsupported { .. })));
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let registry = CodecRegistry::new();
        let result: Result<Values<i32>, _> = registry.decode_values(br#"{"a": 1} x"#);
        assert!(result.is_err());
    }
}
