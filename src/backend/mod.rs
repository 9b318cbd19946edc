//! Capability traits for the external collaborators the pipeline calls.
//!
//! Each trait covers one backend contract. The pipeline only depends on
//! these traits, so the filesystem backend in [`local`] and the fakes in
//! [`memory`] are interchangeable.

pub mod local;
pub mod memory;

use crate::schema::log_event::{LogEvent, MetricPoint};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

/// upper bound on events returned by a single log query
pub const MAX_PAGE_EVENTS: usize = 10_000;

/// native error text from a backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(error: std::io::Error) -> Self {
        BackendError(error.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(error: serde_json::Error) -> Self {
        BackendError(error.to_string())
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub log_group: String,
    pub start_time_ms: i64,
    pub end_time_ms: i64, // exclusive
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Statistic {
    Sum,
    Average,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, String>,
    pub start_time: i64, // epoch millis
    pub end_time: i64,
    pub period_seconds: u32,
    pub statistics: Vec<Statistic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub checksum_sha256: String, // hex
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: String,
    pub subject: String,
    pub message: String,
}

#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// return events in `[start_time_ms, end_time_ms)`, at most `limit`
    async fn filter_events(&self, query: &LogQuery) -> BackendResult<Vec<LogEvent>>;
}

#[async_trait]
pub trait MetricFetcher: Send + Sync {
    async fn get_statistics(&self, query: &MetricQuery) -> BackendResult<Vec<MetricPoint>>;
}

#[async_trait]
pub trait BlobWriter: Send + Sync {
    /// store the object and return its fully qualified location
    async fn put_object(&self, request: &PutObject) -> BackendResult<String>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// publish one message and return its message id
    async fn publish(&self, request: &Publish) -> BackendResult<String>;
}

#[async_trait]
pub trait ParameterSource: Send + Sync {
    async fn get_parameter(&self, name: &str, decrypt: bool) -> BackendResult<serde_json::Value>;
}

/// hex SHA-256 of a request body
pub fn checksum(body: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
