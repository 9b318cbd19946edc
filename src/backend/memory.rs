//! In-memory backends with injectable failures.

use super::{
    BackendError, BackendResult, BlobWriter, LogFetcher, LogQuery, MetricFetcher, MetricQuery,
    Notifier, ParameterSource, Publish, PutObject,
};
use crate::schema::log_event::{LogEvent, MetricPoint};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryLogStore {
    groups: HashMap<String, Vec<LogEvent>>,
    failures: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, log_group: &str, events: Vec<LogEvent>) -> Self {
        self.groups.insert(log_group.to_string(), events);
        self
    }

    /// every query against `log_group` fails with `message`
    pub fn failing(mut self, log_group: &str, message: &str) -> Self {
        self.failures.insert(log_group.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogFetcher for MemoryLogStore {
    async fn filter_events(&self, query: &LogQuery) -> BackendResult<Vec<LogEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failures.get(&query.log_group) {
            return Err(BackendError(message.clone()));
        }
        let events = self.groups.get(&query.log_group).ok_or_else(|| {
            BackendError(format!(
                "ResourceNotFoundException: log group {} does not exist",
                query.log_group
            ))
        })?;
        Ok(events
            .iter()
            .filter(|e| e.timestamp >= query.start_time_ms && e.timestamp < query.end_time_ms)
            .take(query.limit)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryMetrics {
    points: Vec<MetricPoint>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MemoryMetrics {
    pub fn new(points: Vec<MetricPoint>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricFetcher for MemoryMetrics {
    async fn get_statistics(&self, _query: &MetricQuery) -> BackendResult<Vec<MetricPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(BackendError(message.clone())),
            None => Ok(self.points.clone()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<(String, String), PutObject>>,
    failure: Option<String>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<PutObject> {
        locked(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        locked(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobWriter for MemoryBlobStore {
    async fn put_object(&self, request: &PutObject) -> BackendResult<String> {
        if let Some(message) = &self.failure {
            return Err(BackendError(message.clone()));
        }
        // last write wins
        locked(&self.objects).insert(
            (request.bucket.clone(), request.key.clone()),
            request.clone(),
        );
        Ok(format!("memory://{}/{}", request.bucket, request.key))
    }
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Publish>>,
    failure: Option<String>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Publish> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, request: &Publish) -> BackendResult<String> {
        if let Some(message) = &self.failure {
            return Err(BackendError(message.clone()));
        }
        let mut sent = locked(&self.sent);
        sent.push(request.clone());
        Ok(format!("msg-{}", sent.len()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryParameters {
    values: HashMap<String, serde_json::Value>,
    calls: AtomicUsize,
}

impl MemoryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: serde_json::Value) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterSource for MemoryParameters {
    async fn get_parameter(&self, name: &str, _decrypt: bool) -> BackendResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError(format!("ParameterNotFound: {}", name)))
    }
}
