use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use terrastore_core::{
    BackupContext, BulkGetContext, BulkPutContext, ClusterStats, CodecRegistry,
    ConditionalContext, KeyContext, MapReduceContext, MergeContext, PredicateContext,
    RangeContext, UpdateContext, Values, ValuesContext,
};

use crate::host::HostManager;
use crate::request::{Operation, WireRequest};
use crate::translate::translate;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::{ClientError, Result};

/// Protocol client: one blocking round trip per call.
///
/// Shared across threads behind an `Arc`; the host manager is the only
/// mutable state.
pub struct Connection {
    hosts: Arc<dyn HostManager>,
    transport: Arc<dyn Transport>,
    codecs: Arc<CodecRegistry>,
}

impl Connection {
    pub fn new(
        hosts: Arc<dyn HostManager>,
        transport: Arc<dyn Transport>,
        codecs: CodecRegistry,
    ) -> Self {
        Self {
            hosts,
            transport,
            codecs: Arc::new(codecs),
        }
    }

    /// Connection over the pooled HTTP transport
    pub fn http(
        hosts: Arc<dyn HostManager>,
        codecs: CodecRegistry,
        max_idle_per_host: usize,
    ) -> Result<Self> {
        let transport = HttpTransport::new(max_idle_per_host)?;
        Ok(Self::new(hosts, Arc::new(transport), codecs))
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    #[tracing::instrument(skip(self, operation), fields(operation = operation.name()))]
    fn execute(&self, operation: Operation<'_>) -> Result<Vec<u8>> {
        let request = WireRequest::for_operation(&operation)?;
        let host = self.hosts.host();
        let url = request.url(&host)?;

        tracing::debug!(
            host = %host,
            method = %request.method,
            path = %request.path(),
            "Sending request"
        );

        match self.transport.send(&url, &request) {
            Ok(response) if response.is_success() => Ok(response.body),
            Ok(response) => {
                tracing::debug!(status = response.status, "Request failed");
                Err(translate(
                    operation.error_family(),
                    response.status,
                    &response.body,
                ))
            }
            Err(TransportError::Connect(source)) => {
                tracing::error!(
                    host = %host,
                    error = %source,
                    "Unable to connect, suspecting host"
                );
                self.hosts.suspect(&host);
                Err(ClientError::Connection { host, source })
            }
            Err(TransportError::Other(source)) => Err(ClientError::Client {
                message: source.to_string(),
                source: Some(source),
            }),
        }
    }

    fn decode<T: DeserializeOwned + 'static>(&self, body: &[u8]) -> Result<T> {
        Ok(self.codecs.decode_slice(body)?)
    }

    fn decode_values<T: DeserializeOwned + 'static>(&self, body: &[u8]) -> Result<Values<T>> {
        Ok(self.codecs.decode_values(body)?)
    }

    pub fn cluster_stats(&self) -> Result<ClusterStats> {
        let body = self.execute(Operation::ClusterStats)?;
        self.decode(&body)
    }

    pub fn clear_bucket(&self, bucket: &str) -> Result<()> {
        self.execute(Operation::ClearBucket { bucket })?;
        Ok(())
    }

    pub fn buckets(&self) -> Result<BTreeSet<String>> {
        let body = self.execute(Operation::ListBuckets)?;
        self.decode(&body)
    }

    pub fn put_value<T: Serialize + 'static>(&self, context: &KeyContext, value: &T) -> Result<()> {
        let value = self.codecs.encode(value)?;
        self.execute(Operation::PutValue(context, value))?;
        Ok(())
    }

    pub fn conditional_put_value<T: Serialize + 'static>(
        &self,
        context: &ConditionalContext,
        value: &T,
    ) -> Result<()> {
        let value = self.codecs.encode(value)?;
        self.execute(Operation::ConditionalPut(context, value))?;
        Ok(())
    }

    pub fn remove_value(&self, context: &KeyContext) -> Result<()> {
        self.execute(Operation::RemoveValue(context))?;
        Ok(())
    }

    pub fn get_value<T: DeserializeOwned + 'static>(&self, context: &KeyContext) -> Result<T> {
        let body = self.execute(Operation::GetValue(context))?;
        self.decode(&body)
    }

    pub fn conditional_get_value<T: DeserializeOwned + 'static>(
        &self,
        context: &ConditionalContext,
    ) -> Result<T> {
        let body = self.execute(Operation::ConditionalGet(context))?;
        self.decode(&body)
    }

    pub fn all_values<T: DeserializeOwned + 'static>(
        &self,
        context: &ValuesContext,
    ) -> Result<Values<T>> {
        let body = self.execute(Operation::AllValues(context))?;
        self.decode_values(&body)
    }

    pub fn query_by_range<T: DeserializeOwned + 'static>(
        &self,
        context: &RangeContext,
    ) -> Result<Values<T>> {
        let body = self.execute(Operation::QueryByRange(context))?;
        self.decode_values(&body)
    }

    /// Returns the keys that were removed
    pub fn remove_by_range(&self, context: &RangeContext) -> Result<BTreeSet<String>> {
        let body = self.execute(Operation::RemoveByRange(context))?;
        self.decode(&body)
    }

    pub fn query_by_predicate<T: DeserializeOwned + 'static>(
        &self,
        context: &PredicateContext,
    ) -> Result<Values<T>> {
        let body = self.execute(Operation::QueryByPredicate(context))?;
        self.decode_values(&body)
    }

    pub fn query_by_map_reduce<T: DeserializeOwned + 'static>(
        &self,
        context: &MapReduceContext,
    ) -> Result<T> {
        let body = self.execute(Operation::MapReduce(context))?;
        self.decode(&body)
    }

    pub fn export_backup(&self, context: &BackupContext) -> Result<()> {
        self.execute(Operation::ExportBackup(context))?;
        Ok(())
    }

    pub fn import_backup(&self, context: &BackupContext) -> Result<()> {
        self.execute(Operation::ImportBackup(context))?;
        Ok(())
    }

    /// Returns the document as stored after the update
    pub fn execute_update<T: DeserializeOwned + 'static>(
        &self,
        context: &UpdateContext,
    ) -> Result<T> {
        let body = self.execute(Operation::Update(context))?;
        self.decode(&body)
    }

    pub fn execute_merge<T: DeserializeOwned + 'static>(
        &self,
        context: &MergeContext,
    ) -> Result<T> {
        let body = self.execute(Operation::Merge(context))?;
        self.decode(&body)
    }

    /// Returns the keys the server stored
    pub fn bulk_put<T: Serialize + 'static>(
        &self,
        context: &BulkPutContext<T>,
    ) -> Result<BTreeSet<String>> {
        let values = self.codecs.encode_values(context.values())?;
        let body = self.execute(Operation::BulkPut {
            bucket: context.bucket(),
            values,
        })?;
        self.decode(&body)
    }

    pub fn bulk_get<T: DeserializeOwned + 'static>(
        &self,
        context: &BulkGetContext,
    ) -> Result<Values<T>> {
        let body = self.execute(Operation::BulkGet(context))?;
        self.decode_values(&body)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.hosts.host())
            .field("codecs", &self.codecs)
            .finish()
    }
}
