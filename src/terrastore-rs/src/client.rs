//! Fluent, immutable builders over a shared [`Connection`].
//!
//! Every builder method returns a new value; nothing is sent until a
//! terminal call such as `get`, `put` or `execute_export`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

use terrastore_core::{
    BackupContext, BulkGetContext, BulkPutContext, ClientConfig, ClusterStats, CodecRegistry,
    ConditionalContext, HostPolicy, KeyContext, MapReduceContext, MapReduceQuery, MergeContext,
    MergeDescriptor, PredicateContext, RangeContext, UpdateContext, Values, ValuesContext,
};

use crate::connection::Connection;
use crate::host::{HostManager, OrderedHostManager, SingleHostManager};
use crate::{ClientError, Result};

/// Entry point of the client API
#[derive(Debug, Clone)]
pub struct TerrastoreClient {
    connection: Arc<Connection>,
}

impl TerrastoreClient {
    /// Client bound to a single server with serde-only codecs
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_host_manager(Arc::new(SingleHostManager::new(host)), CodecRegistry::new())
    }

    pub fn with_host_manager(hosts: Arc<dyn HostManager>, codecs: CodecRegistry) -> Result<Self> {
        let max_idle = ClientConfig::default().max_idle_per_host;
        let connection = Connection::http(hosts, codecs, max_idle)?;
        Ok(Self::from_connection(Arc::new(connection)))
    }

    pub fn from_config(config: &ClientConfig, codecs: CodecRegistry) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ClientError::client_with("Invalid client configuration", e))?;

        let hosts: Arc<dyn HostManager> = match config.host_policy {
            HostPolicy::Single => {
                // validate() guarantees at least one host
                let host = config.hosts.first().cloned().unwrap_or_default();
                Arc::new(SingleHostManager::new(host))
            }
            HostPolicy::Ordered => Arc::new(OrderedHostManager::new(config.hosts.iter().cloned())?),
        };
        let connection = Connection::http(hosts, codecs, config.max_idle_per_host)?;
        Ok(Self::from_connection(Arc::new(connection)))
    }

    pub fn from_connection(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn bucket(&self, name: impl Into<String>) -> BucketOperation {
        BucketOperation {
            connection: Arc::clone(&self.connection),
            bucket: name.into(),
        }
    }

    pub fn buckets(&self) -> BucketsOperation {
        BucketsOperation {
            connection: Arc::clone(&self.connection),
        }
    }

    pub fn stats(&self) -> StatsOperation {
        StatsOperation {
            connection: Arc::clone(&self.connection),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BucketsOperation {
    connection: Arc<Connection>,
}

impl BucketsOperation {
    pub fn list(&self) -> Result<BTreeSet<String>> {
        self.connection.buckets()
    }
}

#[derive(Debug, Clone)]
pub struct StatsOperation {
    connection: Arc<Connection>,
}

impl StatsOperation {
    pub fn cluster(&self) -> Result<ClusterStats> {
        self.connection.cluster_stats()
    }
}

#[derive(Debug, Clone)]
pub struct BucketOperation {
    connection: Arc<Connection>,
    bucket: String,
}

impl BucketOperation {
    pub fn name(&self) -> &str {
        &self.bucket
    }

    /// Remove every document in the bucket
    pub fn clear(&self) -> Result<()> {
        self.connection.clear_bucket(&self.bucket)
    }

    pub fn key(&self, key: impl Into<String>) -> KeyOperation {
        KeyOperation {
            connection: Arc::clone(&self.connection),
            context: KeyContext::new(self.bucket.clone(), key),
        }
    }

    pub fn values(&self) -> ValuesOperation {
        ValuesOperation {
            connection: Arc::clone(&self.connection),
            context: ValuesContext::new(self.bucket.clone()),
        }
    }

    pub fn predicate(&self, predicate: impl Into<String>) -> PredicateOperation {
        PredicateOperation {
            connection: Arc::clone(&self.connection),
            context: PredicateContext::new(self.bucket.clone(), predicate),
        }
    }

    /// Range under the server's default comparator
    pub fn range(&self) -> RangeOperation {
        RangeOperation {
            connection: Arc::clone(&self.connection),
            context: RangeContext::new(self.bucket.clone()),
        }
    }

    pub fn range_with_comparator(&self, comparator: impl Into<String>) -> RangeOperation {
        RangeOperation {
            connection: Arc::clone(&self.connection),
            context: RangeContext::new(self.bucket.clone()).with_comparator(comparator),
        }
    }

    pub fn backup(&self) -> BackupOperation {
        BackupOperation {
            connection: Arc::clone(&self.connection),
            context: BackupContext::new(self.bucket.clone()),
        }
    }

    pub fn map_reduce(&self, query: MapReduceQuery) -> MapReduceOperation {
        MapReduceOperation {
            connection: Arc::clone(&self.connection),
            context: MapReduceContext::new(self.bucket.clone(), query),
        }
    }

    pub fn bulk(&self) -> BulkOperation {
        BulkOperation {
            connection: Arc::clone(&self.connection),
            bucket: self.bucket.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyOperation {
    connection: Arc<Connection>,
    context: KeyContext,
}

impl KeyOperation {
    pub fn put<T: Serialize + 'static>(&self, value: &T) -> Result<()> {
        self.connection.put_value(&self.context, value)
    }

    /// Fails with [`ClientError::NoSuchKey`] when the key is absent
    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.get_value(&self.context)
    }

    pub fn remove(&self) -> Result<()> {
        self.connection.remove_value(&self.context)
    }

    pub fn update(&self, function: impl Into<String>) -> UpdateOperation {
        UpdateOperation {
            connection: Arc::clone(&self.connection),
            context: UpdateContext::new(self.context.bucket(), self.context.key(), function),
        }
    }

    pub fn merge(&self, descriptor: MergeDescriptor) -> MergeOperation {
        MergeOperation {
            connection: Arc::clone(&self.connection),
            context: MergeContext::new(self.context.bucket(), self.context.key(), descriptor),
        }
    }

    pub fn conditional(&self, predicate: impl Into<String>) -> ConditionalOperation {
        ConditionalOperation {
            connection: Arc::clone(&self.connection),
            context: ConditionalContext::new(self.context.bucket(), self.context.key(), predicate),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConditionalOperation {
    connection: Arc<Connection>,
    context: ConditionalContext,
}

impl ConditionalOperation {
    /// Stores the value only if the current document satisfies the predicate
    pub fn put<T: Serialize + 'static>(&self, value: &T) -> Result<()> {
        self.connection.conditional_put_value(&self.context, value)
    }

    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.conditional_get_value(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct ValuesOperation {
    connection: Arc<Connection>,
    context: ValuesContext,
}

impl ValuesOperation {
    pub fn limit(&self, limit: u32) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context: self.context.with_limit(limit),
        }
    }

    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<Values<T>> {
        self.connection.all_values(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct RangeOperation {
    connection: Arc<Connection>,
    context: RangeContext,
}

impl RangeOperation {
    fn with(&self, context: RangeContext) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context,
        }
    }

    /// First key of the range; required
    pub fn from(&self, start_key: impl Into<String>) -> Self {
        self.with(self.context.with_start_key(start_key))
    }

    pub fn to(&self, end_key: impl Into<String>) -> Self {
        self.with(self.context.with_end_key(end_key))
    }

    pub fn predicate(&self, predicate: impl Into<String>) -> Self {
        self.with(self.context.with_predicate(predicate))
    }

    pub fn limit(&self, limit: u32) -> Self {
        self.with(self.context.with_limit(limit))
    }

    pub fn time_to_live(&self, time_to_live: u64) -> Self {
        self.with(self.context.with_time_to_live(time_to_live))
    }

    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<Values<T>> {
        self.connection.query_by_range(&self.context)
    }

    /// Returns the removed keys
    pub fn remove(&self) -> Result<BTreeSet<String>> {
        self.connection.remove_by_range(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct PredicateOperation {
    connection: Arc<Connection>,
    context: PredicateContext,
}

impl PredicateOperation {
    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<Values<T>> {
        self.connection.query_by_predicate(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOperation {
    connection: Arc<Connection>,
    context: UpdateContext,
}

impl UpdateOperation {
    pub fn timeout(&self, timeout: u64) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context: self.context.with_timeout(timeout),
        }
    }

    pub fn parameters(&self, parameters: Map<String, Value>) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context: self.context.with_parameters(parameters),
        }
    }

    pub fn execute_and_get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.execute_update(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct MergeOperation {
    connection: Arc<Connection>,
    context: MergeContext,
}

impl MergeOperation {
    pub fn execute_and_get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.execute_merge(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct MapReduceOperation {
    connection: Arc<Connection>,
    context: MapReduceContext,
}

impl MapReduceOperation {
    pub fn execute<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.query_by_map_reduce(&self.context)
    }
}

#[derive(Debug, Clone)]
pub struct BulkOperation {
    connection: Arc<Connection>,
    bucket: String,
}

impl BulkOperation {
    pub fn get<T, I, S>(&self, keys: I) -> Result<Values<T>>
    where
        T: DeserializeOwned + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let context = BulkGetContext::new(self.bucket.clone(), keys);
        self.connection.bulk_get(&context)
    }

    /// Returns the keys the server stored
    pub fn put<T: Serialize + 'static>(&self, values: Values<T>) -> Result<BTreeSet<String>> {
        let context = BulkPutContext::new(self.bucket.clone(), values);
        self.connection.bulk_put(&context)
    }
}

#[derive(Debug, Clone)]
pub struct BackupOperation {
    connection: Arc<Connection>,
    context: BackupContext,
}

impl BackupOperation {
    /// Server-side file name
    pub fn file(&self, file: impl Into<String>) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context: self.context.with_file(file),
        }
    }

    pub fn secret_key(&self, secret_key: impl Into<String>) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            context: self.context.with_secret_key(secret_key),
        }
    }

    pub fn execute_export(&self) -> Result<()> {
        self.connection.export_backup(&self.context)
    }

    pub fn execute_import(&self) -> Result<()> {
        self.connection.import_backup(&self.context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::WireRequest;
    use crate::transport::{Transport, TransportError, WireResponse};
    use reqwest::Url;
    use serde_json::json;
    use std::sync::Mutex;

    /// Answers every request with the same body and records the URLs
    struct FixedTransport {
        status: u16,
        body: &'static str,
        urls: Mutex<Vec<String>>,
    }

    impl Transport for FixedTransport {
        fn send(
            &self,
            url: &Url,
            _request: &WireRequest,
        ) -> std::result::Result<WireResponse, TransportError> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(WireResponse {
                status: self.status,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn client(status: u16, body: &'static str) -> (TerrastoreClient, Arc<FixedTransport>) {
        let transport = Arc::new(FixedTransport {
            status,
            body,
            urls: Mutex::default(),
        });
        let connection = Connection::new(
            Arc::new(SingleHostManager::new("http://localhost:8080")),
            transport.clone(),
            CodecRegistry::new(),
        );
        (TerrastoreClient::from_connection(Arc::new(connection)), transport)
    }

    #[test]
    fn test_builders_do_not_mutate_their_source() {
        let (client, transport) = client(200, "{}");
        let range = client.bucket("customers").range().from("a");
        let narrowed = range.to("m").limit(5);

        let _: Values<Value> = range.get().unwrap();
        let _: Values<Value> = narrowed.get().unwrap();

        let urls = transport.urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/customers/range?startKey=a&limit=0&timeToLive=0",
                "http://localhost:8080/customers/range?startKey=a&limit=5&timeToLive=0&endKey=m",
            ]
        );
    }

    #[test]
    fn test_key_operation_paths() {
        let (client, transport) = client(200, r#"{"name":"Sergio"}"#);
        let key = client.bucket("customers").key("sergio");

        let value: Value = key.get().unwrap();
        assert_eq!(value, json!({"name": "Sergio"}));

        let _: Value = key.update("counter").timeout(1000).execute_and_get().unwrap();
        let _: Value = key
            .merge(MergeDescriptor::new().remove(["age"]))
            .execute_and_get()
            .unwrap();

        let urls = transport.urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/customers/sergio",
                "http://localhost:8080/customers/sergio/update?function=counter&timeout=1000",
                "http://localhost:8080/customers/sergio/merge",
            ]
        );
    }

    #[test]
    fn test_backup_requires_secret_before_sending() {
        let (client, transport) = client(204, "");
        let backup = client.bucket("customers").backup().file("customers.bak");

        assert!(matches!(
            backup.execute_export(),
            Err(ClientError::Client { .. })
        ));
        assert!(transport.urls.lock().unwrap().is_empty());

        backup.secret_key("SECRET-KEY").execute_import().unwrap();
        assert_eq!(
            transport.urls.lock().unwrap().as_slice(),
            ["http://localhost:8080/customers/import?source=customers.bak&secret=SECRET-KEY"]
        );
    }

    #[test]
    fn test_from_config_ordered_policy() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"hosts": ["http://a:8080", "http://b:8080"], "host_policy": "ordered"}"#,
        )
        .unwrap();
        let client = TerrastoreClient::from_config(&config, CodecRegistry::new()).unwrap();
        assert!(format!("{:?}", client).contains("http://a:8080"));
    }

    #[test]
    fn test_from_config_rejects_empty_hosts() {
        let config = ClientConfig {
            hosts: vec![],
            ..ClientConfig::default()
        };
        assert!(matches!(
            TerrastoreClient::from_config(&config, CodecRegistry::new()),
            Err(ClientError::Client { .. })
        ));
    }
}
