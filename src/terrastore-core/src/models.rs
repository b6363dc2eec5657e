use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Error body returned by the server on failed requests.
///
/// Only ever decoded; the client never sends one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub code: i32,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl<'de> Deserialize<'de> for ErrorMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ErrorMessageVisitor;

        impl<'de> Visitor<'de> for ErrorMessageVisitor {
            type Value = ErrorMessage;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an error object with message and code fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ErrorMessage, A::Error> {
                let mut message: Option<String> = None;
                let mut code: Option<i32> = None;
                while let Some(field) = map.next_key::<String>()? {
                    match field.as_str() {
                        "message" => message = Some(map.next_value()?),
                        "code" => code = Some(map.next_value()?),
                        _ => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                let message = message.ok_or_else(|| de::Error::missing_field("message"))?;
                let code = code.ok_or_else(|| de::Error::missing_field("code"))?;
                Ok(ErrorMessage { code, message })
            }
        }

        deserializer.deserialize_map(ErrorMessageVisitor)
    }
}

/// Cluster topology as reported by `/_stats/cluster`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub status: ClusterStatus,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClusterStatus {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Partial update applied atomically by the server's merge endpoint.
///
/// Serializes as a plain JSON object:
/// - `"+"`: entries to add
/// - `"*"`: entries to replace
/// - `"-"`: keys to remove
/// - `"<array>": ["+", ...]` / `["-", ...]`: array element additions/removals
/// - `"<key>": {...}`: nested merge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergeDescriptor {
    descriptor: Map<String, Value>,
}

impl MergeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(&self, key: impl Into<String>, value: Value) -> Self {
        let mut descriptor = self.descriptor.clone();
        descriptor.insert(key.into(), value);
        Self { descriptor }
    }

    pub fn add(&self, entries: Map<String, Value>) -> Self {
        self.with("+", Value::Object(entries))
    }

    pub fn replace(&self, entries: Map<String, Value>) -> Self {
        self.with("*", Value::Object(entries))
    }

    pub fn remove<I, S>(&self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().map(Into::into).collect();
        self.with("-", Value::Array(keys.into_iter().map(Value::String).collect()))
    }

    pub fn add_to_array(&self, array_key: impl Into<String>, values: Vec<Value>) -> Self {
        let mut adds = Vec::with_capacity(values.len() + 1);
        adds.push(Value::from("+"));
        adds.extend(values);
        self.with(array_key, Value::Array(adds))
    }

    pub fn remove_from_array<I, S>(&self, array_key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut removes = vec![Value::from("-")];
        removes.extend(values.into_iter().map(|v| Value::String(v.into())));
        self.with(array_key, Value::Array(removes))
    }

    pub fn merge(&self, key: impl Into<String>, nested: &MergeDescriptor) -> Self {
        self.with(key, Value::Object(nested.descriptor.clone()))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.descriptor
    }
}

/// Server-side map/reduce job over a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapReduceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<MapReduceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<MapReduceTask>,
}

impl MapReduceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, range: MapReduceRange) -> Self {
        Self {
            range: Some(range),
            ..self.clone()
        }
    }

    pub fn task(&self, task: MapReduceTask) -> Self {
        Self {
            task: Some(task),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapReduceRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    start_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_to_live: Option<u64>,
}

impl MapReduceRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(&self, key: impl Into<String>) -> Self {
        Self {
            start_key: Some(key.into()),
            ..self.clone()
        }
    }

    pub fn to(&self, key: impl Into<String>) -> Self {
        Self {
            end_key: Some(key.into()),
            ..self.clone()
        }
    }

    pub fn comparator(&self, comparator: impl Into<String>) -> Self {
        Self {
            comparator: Some(comparator.into()),
            ..self.clone()
        }
    }

    pub fn time_to_live(&self, time_to_live: u64) -> Self {
        Self {
            time_to_live: Some(time_to_live),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapReduceTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    mapper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    combiner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reducer: Option<String>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Map<String, Value>>,
}

impl MapReduceTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mapper(&self, mapper: impl Into<String>) -> Self {
        Self {
            mapper: Some(mapper.into()),
            ..self.clone()
        }
    }

    pub fn combiner(&self, combiner: impl Into<String>) -> Self {
        Self {
            combiner: Some(combiner.into()),
            ..self.clone()
        }
    }

    pub fn reducer(&self, reducer: impl Into<String>) -> Self {
        Self {
            reducer: Some(reducer.into()),
            ..self.clone()
        }
    }

    pub fn timeout(&self, timeout: u64) -> Self {
        Self {
            timeout: Some(timeout),
            ..self.clone()
        }
    }

    pub fn parameters(&self, parameters: Map<String, Value>) -> Self {
        Self {
            parameters: Some(parameters),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_field_order_and_unknown_fields() {
        let msg: ErrorMessage = serde_json::from_str(
            r#"{"code": 404, "trace": {"nested": [1, 2]}, "message": "not found", "other": null}"#,
        )
        .unwrap();
        assert_eq!(msg, ErrorMessage::new(404, "not found"));
    }

    #[test]
    fn test_error_message_requires_both_fields() {
        assert!(serde_json::from_str::<ErrorMessage>(r#"{"message": "x"}"#).is_err());
        assert!(serde_json::from_str::<ErrorMessage>(r#"{"code": 500}"#).is_err());
        assert!(serde_json::from_str::<ErrorMessage>("Internal Server Error").is_err());
    }

    #[test]
    fn test_cluster_stats_decode() {
        let stats: ClusterStats = serde_json::from_value(json!({
            "clusters": [{
                "name": "cluster-1",
                "status": "AVAILABLE",
                "nodes": [{"name": "node-1", "host": "127.0.0.1", "port": 8080}]
            }]
        }))
        .unwrap();

        assert_eq!(stats.clusters.len(), 1);
        assert_eq!(stats.clusters[0].status, ClusterStatus::Available);
        assert_eq!(stats.clusters[0].nodes[0].port, 8080);
    }

    #[test]
    fn test_merge_descriptor_is_copy_on_write() {
        let mut entries = Map::new();
        entries.insert("name".to_string(), json!("Sergio"));

        let empty = MergeDescriptor::new();
        let added = empty.add(entries);
        let removed = added.remove(["age"]);

        assert!(empty.as_map().is_empty());
        assert_eq!(added.as_map().len(), 1);
        assert_eq!(
            serde_json::to_value(&removed).unwrap(),
            json!({"+": {"name": "Sergio"}, "-": ["age"]})
        );
    }

    #[test]
    fn test_merge_descriptor_arrays_and_nesting() {
        let nested = MergeDescriptor::new().remove(["zip"]);
        let descriptor = MergeDescriptor::new()
            .add_to_array("phones", vec![json!("123")])
            .remove_from_array("tags", ["old"])
            .merge("address", &nested);

        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({
                "phones": ["+", "123"],
                "tags": ["-", "old"],
                "address": {"-": ["zip"]}
            })
        );
    }

    #[test]
    fn test_map_reduce_query_omits_unset_fields() {
        let query = MapReduceQuery::new()
            .range(MapReduceRange::new().from("aaaa").to("cccc"))
            .task(MapReduceTask::new().mapper("size").reducer("size").timeout(10000));

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "range": {"startKey": "aaaa", "endKey": "cccc"},
                "task": {"mapper": "size", "reducer": "size", "timeout": 10000}
            })
        );
        assert_eq!(serde_json::to_value(MapReduceQuery::new()).unwrap(), json!({}));
    }
}
