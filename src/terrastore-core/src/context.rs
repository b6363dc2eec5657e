//! Immutable parameter bundles, one per remote operation kind.
//!
//! Every `with_*` method returns a new context and leaves the receiver
//! untouched, so a context can be shared freely across threads.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::models::{MapReduceQuery, MergeDescriptor};
use crate::values::Values;

/// A single document in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    bucket: String,
    key: String,
}

impl KeyContext {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// A single document guarded by a server-side predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalContext {
    bucket: String,
    key: String,
    predicate: String,
}

impl ConditionalContext {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            predicate: predicate.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

/// All documents of a bucket, optionally capped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesContext {
    bucket: String,
    limit: u32,
}

impl ValuesContext {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            limit: 0,
        }
    }

    pub fn with_limit(&self, limit: u32) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Zero means no limit
    pub fn limit(&self) -> u32 {
        self.limit
    }
}

/// Key range selection under a named comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeContext {
    bucket: String,
    comparator: Option<String>,
    start_key: Option<String>,
    end_key: Option<String>,
    predicate: Option<String>,
    limit: u32,
    time_to_live: u64,
}

impl RangeContext {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            comparator: None,
            start_key: None,
            end_key: None,
            predicate: None,
            limit: 0,
            time_to_live: 0,
        }
    }

    pub fn with_comparator(&self, comparator: impl Into<String>) -> Self {
        Self {
            comparator: Some(comparator.into()),
            ..self.clone()
        }
    }

    pub fn with_start_key(&self, key: impl Into<String>) -> Self {
        Self {
            start_key: Some(key.into()),
            ..self.clone()
        }
    }

    pub fn with_end_key(&self, key: impl Into<String>) -> Self {
        Self {
            end_key: Some(key.into()),
            ..self.clone()
        }
    }

    pub fn with_predicate(&self, predicate: impl Into<String>) -> Self {
        Self {
            predicate: Some(predicate.into()),
            ..self.clone()
        }
    }

    pub fn with_limit(&self, limit: u32) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    pub fn with_time_to_live(&self, time_to_live: u64) -> Self {
        Self {
            time_to_live,
            ..self.clone()
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn comparator(&self) -> Option<&str> {
        self.comparator.as_deref()
    }

    pub fn start_key(&self) -> Option<&str> {
        self.start_key.as_deref()
    }

    pub fn end_key(&self) -> Option<&str> {
        self.end_key.as_deref()
    }

    pub fn predicate(&self) -> Option<&str> {
        self.predicate.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Milliseconds a cached range result may be reused by the server
    pub fn time_to_live(&self) -> u64 {
        self.time_to_live
    }
}

/// Predicate query over every document of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateContext {
    bucket: String,
    predicate: String,
}

impl PredicateContext {
    pub fn new(bucket: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            predicate: predicate.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

/// Server-side update function applied to one document
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateContext {
    bucket: String,
    key: String,
    function: String,
    parameters: Map<String, Value>,
    timeout: u64,
}

impl UpdateContext {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            function: function.into(),
            parameters: Map::new(),
            timeout: 0,
        }
    }

    pub fn with_parameters(&self, parameters: Map<String, Value>) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    /// Advisory: bounds how long the server holds the document lock
    pub fn with_timeout(&self, timeout: u64) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeContext {
    bucket: String,
    key: String,
    descriptor: MergeDescriptor,
}

impl MergeContext {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        descriptor: MergeDescriptor,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            descriptor,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn descriptor(&self) -> &MergeDescriptor {
        &self.descriptor
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkGetContext {
    bucket: String,
    keys: BTreeSet<String>,
}

impl BulkGetContext {
    pub fn new<I, S>(bucket: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bucket: bucket.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn keys(&self) -> &BTreeSet<String> {
        &self.keys
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkPutContext<T> {
    bucket: String,
    values: Values<T>,
}

impl<T> BulkPutContext<T> {
    pub fn new(bucket: impl Into<String>, values: Values<T>) -> Self {
        Self {
            bucket: bucket.into(),
            values,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn values(&self) -> &Values<T> {
        &self.values
    }
}

/// Bucket export/import through a server-side file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupContext {
    bucket: String,
    file: Option<String>,
    secret_key: Option<String>,
}

impl BackupContext {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            file: None,
            secret_key: None,
        }
    }

    pub fn with_file(&self, file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..self.clone()
        }
    }

    pub fn with_secret_key(&self, secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: Some(secret_key.into()),
            ..self.clone()
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapReduceContext {
    bucket: String,
    query: MapReduceQuery,
}

impl MapReduceContext {
    pub fn new(bucket: impl Into<String>, query: MapReduceQuery) -> Self {
        Self {
            bucket: bucket.into(),
            query,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn query(&self) -> &MapReduceQuery {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_range_context_copy_on_write() {
        let base = RangeContext::new("bucket").with_start_key("a");
        let narrowed = base.with_end_key("c").with_limit(10);

        assert_eq!(base.end_key(), None);
        assert_eq!(base.limit(), 0);
        assert_eq!(narrowed.start_key(), Some("a"));
        assert_eq!(narrowed.end_key(), Some("c"));
        assert_eq!(narrowed.limit(), 10);
    }

    #[test]
    fn test_shared_context_is_not_mutated_by_other_threads() {
        let shared = Arc::new(ValuesContext::new("bucket"));

        let handles: Vec<_> = (1..=4)
            .map(|i| {
                let ctx = Arc::clone(&shared);
                thread::spawn(move || ctx.with_limit(i).limit())
            })
            .collect();

        let limits: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(limits, vec![1, 2, 3, 4]);
        assert_eq!(shared.limit(), 0);
    }

    #[test]
    fn test_update_context_defaults() {
        let ctx = UpdateContext::new("bucket", "key", "counter");
        assert!(ctx.parameters().is_empty());
        assert_eq!(ctx.timeout(), 0);
        assert_eq!(ctx.with_timeout(1000).timeout(), 1000);
    }

    #[test]
    fn test_bulk_get_context_deduplicates_keys() {
        let ctx = BulkGetContext::new("bucket", ["b", "a", "b"]);
        let keys: Vec<&str> = ctx.keys().iter().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_backup_context_builder() {
        let ctx = BackupContext::new("bucket").with_file("bucket.bak");
        assert_eq!(ctx.file(), Some("bucket.bak"));
        assert_eq!(ctx.secret_key(), None);
        assert_eq!(ctx.with_secret_key("SECRET-KEY").secret_key(), Some("SECRET-KEY"));
    }
}
