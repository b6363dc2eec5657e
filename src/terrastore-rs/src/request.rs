//! Maps each remote operation onto its HTTP method, path, query and body.

use reqwest::{Method, Url};
use serde_json::Value;
use terrastore_core::{
    BackupContext, BulkGetContext, ConditionalContext, KeyContext, MapReduceContext,
    MergeContext, PredicateContext, RangeContext, UpdateContext, Values, ValuesContext,
};

use crate::translate::ErrorFamily;
use crate::{ClientError, Result};

/// One remote call, with bodies already encoded to JSON
#[derive(Debug, Clone)]
pub enum Operation<'a> {
    ClusterStats,
    ListBuckets,
    ClearBucket { bucket: &'a str },
    GetValue(&'a KeyContext),
    PutValue(&'a KeyContext, Value),
    RemoveValue(&'a KeyContext),
    ConditionalGet(&'a ConditionalContext),
    ConditionalPut(&'a ConditionalContext, Value),
    AllValues(&'a ValuesContext),
    QueryByRange(&'a RangeContext),
    RemoveByRange(&'a RangeContext),
    QueryByPredicate(&'a PredicateContext),
    MapReduce(&'a MapReduceContext),
    Update(&'a UpdateContext),
    Merge(&'a MergeContext),
    BulkGet(&'a BulkGetContext),
    BulkPut { bucket: &'a str, values: Values<Value> },
    ExportBackup(&'a BackupContext),
    ImportBackup(&'a BackupContext),
}

impl Operation<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ClusterStats => "cluster_stats",
            Operation::ListBuckets => "list_buckets",
            Operation::ClearBucket { .. } => "clear_bucket",
            Operation::GetValue(_) => "get_value",
            Operation::PutValue(..) => "put_value",
            Operation::RemoveValue(_) => "remove_value",
            Operation::ConditionalGet(_) => "conditional_get_value",
            Operation::ConditionalPut(..) => "conditional_put_value",
            Operation::AllValues(_) => "all_values",
            Operation::QueryByRange(_) => "query_by_range",
            Operation::RemoveByRange(_) => "remove_by_range",
            Operation::QueryByPredicate(_) => "query_by_predicate",
            Operation::MapReduce(_) => "query_by_map_reduce",
            Operation::Update(_) => "execute_update",
            Operation::Merge(_) => "execute_merge",
            Operation::BulkGet(_) => "bulk_get",
            Operation::BulkPut { .. } => "bulk_put",
            Operation::ExportBackup(_) => "export_backup",
            Operation::ImportBackup(_) => "import_backup",
        }
    }

    /// Which status overrides apply when this operation fails
    pub fn error_family(&self) -> ErrorFamily {
        match self {
            Operation::GetValue(_) => ErrorFamily::Get,
            Operation::ConditionalGet(_) | Operation::ConditionalPut(..) => {
                ErrorFamily::Conditional
            }
            Operation::MapReduce(_) => ErrorFamily::MapReduce,
            Operation::Update(_) => ErrorFamily::Update,
            Operation::Merge(_) => ErrorFamily::Merge,
            _ => ErrorFamily::General,
        }
    }
}

/// Transport-neutral HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    /// Unescaped path segments
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl WireRequest {
    fn new(method: Method, path: &[&str]) -> Self {
        Self {
            method,
            path: path.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    fn param_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.param(name, value),
            None => self,
        }
    }

    fn json_body<T: serde::Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::client_with("Failed to encode request body", e))?;
        self.body = Some(bytes);
        Ok(self)
    }

    fn empty_body(mut self) -> Self {
        self.body = Some(Vec::new());
        self
    }

    pub fn for_operation(operation: &Operation<'_>) -> Result<Self> {
        let request = match operation {
            Operation::ClusterStats => Self::new(Method::GET, &["_stats", "cluster"]),
            Operation::ListBuckets => Self::new(Method::GET, &[]),
            Operation::ClearBucket { bucket } => Self::new(Method::DELETE, &[bucket]),
            Operation::GetValue(ctx) => Self::new(Method::GET, &[ctx.bucket(), ctx.key()]),
            Operation::PutValue(ctx, value) => {
                Self::new(Method::PUT, &[ctx.bucket(), ctx.key()]).json_body(value)?
            }
            Operation::RemoveValue(ctx) => {
                Self::new(Method::DELETE, &[ctx.bucket(), ctx.key()])
            }
            Operation::ConditionalGet(ctx) => Self::new(Method::GET, &[ctx.bucket(), ctx.key()])
                .param("predicate", ctx.predicate()),
            Operation::ConditionalPut(ctx, value) => {
                Self::new(Method::PUT, &[ctx.bucket(), ctx.key()])
                    .param("predicate", ctx.predicate())
                    .json_body(value)?
            }
            Operation::AllValues(ctx) => {
                Self::new(Method::GET, &[ctx.bucket()]).param("limit", ctx.limit())
            }
            Operation::QueryByRange(ctx) => Self::range(Method::GET, ctx)?,
            Operation::RemoveByRange(ctx) => Self::range(Method::DELETE, ctx)?,
            Operation::QueryByPredicate(ctx) => {
                Self::new(Method::GET, &[ctx.bucket(), "predicate"])
                    .param("predicate", ctx.predicate())
            }
            Operation::MapReduce(ctx) => {
                Self::new(Method::POST, &[ctx.bucket(), "mapReduce"]).json_body(ctx.query())?
            }
            Operation::Update(ctx) => Self::new(Method::POST, &[ctx.bucket(), ctx.key(), "update"])
                .param("function", ctx.function())
                .param("timeout", ctx.timeout())
                .json_body(ctx.parameters())?,
            Operation::Merge(ctx) => Self::new(Method::POST, &[ctx.bucket(), ctx.key(), "merge"])
                .json_body(ctx.descriptor())?,
            Operation::BulkGet(ctx) => {
                Self::new(Method::POST, &[ctx.bucket(), "bulk", "get"]).json_body(ctx.keys())?
            }
            Operation::BulkPut { bucket, values } => {
                Self::new(Method::POST, &[bucket, "bulk", "put"]).json_body(values)?
            }
            Operation::ExportBackup(ctx) => {
                let (file, secret) = Self::backup_params(ctx)?;
                Self::new(Method::POST, &[ctx.bucket(), "export"])
                    .param("destination", file)
                    .param("secret", secret)
                    .empty_body()
            }
            Operation::ImportBackup(ctx) => {
                let (file, secret) = Self::backup_params(ctx)?;
                Self::new(Method::POST, &[ctx.bucket(), "import"])
                    .param("source", file)
                    .param("secret", secret)
                    .empty_body()
            }
        };
        Ok(request)
    }

    fn range(method: Method, ctx: &RangeContext) -> Result<Self> {
        let start_key = ctx
            .start_key()
            .ok_or_else(|| ClientError::client("Range query requires a start key"))?;
        Ok(Self::new(method, &[ctx.bucket(), "range"])
            .param("startKey", start_key)
            .param("limit", ctx.limit())
            .param("timeToLive", ctx.time_to_live())
            .param_opt("comparator", ctx.comparator())
            .param_opt("endKey", ctx.end_key())
            .param_opt("predicate", ctx.predicate()))
    }

    fn backup_params(ctx: &BackupContext) -> Result<(&str, &str)> {
        let file = ctx
            .file()
            .ok_or_else(|| ClientError::client("Backup requires a file name"))?;
        let secret = ctx
            .secret_key()
            .ok_or_else(|| ClientError::client("Backup requires a secret key"))?;
        Ok((file, secret))
    }

    /// Unescaped path, for logging
    pub fn path(&self) -> String {
        format!("/{}", self.path.join("/"))
    }

    /// Resolve against a host base URL, escaping every path segment
    pub fn url(&self, host: &str) -> Result<Url> {
        let mut url = Url::parse(host)
            .map_err(|e| ClientError::client_with(format!("Invalid host URL: {}", host), e))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::client(format!("Host URL cannot be a base: {}", host)))?
            .pop_if_empty()
            .extend(&self.path);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}
