//! Filesystem-backed implementation of every backend contract.
//!
//! Layout under the data directory:
//!
//! ```text
//! logs/<group>.jsonl                 one LogEvent per line
//! metrics/<namespace>/<metric>.json  [{timestamp, sum, average}, ...]
//! blobs/<bucket>/<key>
//! notifications/<topic>.jsonl        appended publish records
//! parameters/<name>.json
//! ```
//!
//! Resource names have leading `/` stripped and inner `/` replaced by `_`.
//! The mapping is not injective: `/aws/lambda/app` and `aws_lambda_app` name
//! the same file, so two such log groups read the same events.

use super::{
    checksum, BackendError, BackendResult, BlobWriter, LogFetcher, LogQuery, MetricFetcher,
    MetricQuery, Notifier, ParameterSource, Publish, PutObject,
};
use crate::schema::log_event::{LogEvent, MetricPoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct StoredDatapoint {
    #[serde(default)]
    timestamp: i64,
    #[serde(flatten)]
    point: MetricPoint,
}

#[derive(Debug, Serialize)]
struct PublishRecord<'a> {
    message_id: &'a str,
    published_at: String,
    subject: &'a str,
    message: &'a str,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn log_path(&self, log_group: &str) -> PathBuf {
        self.root.join("logs").join(format!("{}.jsonl", flatten_name(log_group)))
    }

    fn metric_path(&self, namespace: &str, metric: &str) -> PathBuf {
        self.root
            .join("metrics")
            .join(flatten_name(namespace))
            .join(format!("{}.json", flatten_name(metric)))
    }

    fn notification_path(&self, topic: &str) -> PathBuf {
        self.root
            .join("notifications")
            .join(format!("{}.jsonl", flatten_name(topic)))
    }

    fn parameter_path(&self, name: &str) -> PathBuf {
        self.root
            .join("parameters")
            .join(format!("{}.json", flatten_name(name)))
    }

    fn blob_path(&self, bucket: &str, key: &str) -> BackendResult<PathBuf> {
        let key_path = Path::new(key);
        if key.is_empty()
            || key_path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(BackendError(format!("InvalidKey: {}", key)));
        }
        Ok(self
            .root
            .join("blobs")
            .join(flatten_name(bucket))
            .join(key_path))
    }

    /// read back a stored object
    pub async fn read_object(&self, bucket: &str, key: &str) -> BackendResult<Vec<u8>> {
        let path = self.blob_path(bucket, key)?;
        tokio::fs::read(&path)
            .await
            .map_err(not_found("object", &format!("{}/{}", bucket, key)))
    }
}

fn flatten_name(name: &str) -> String {
    name.trim_start_matches('/').replace(['/', '\\'], "_")
}

fn not_found(kind: &str, name: &str) -> impl FnOnce(std::io::Error) -> BackendError {
    let message = format!("ResourceNotFoundException: {} {} does not exist", kind, name);
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            BackendError(message)
        } else {
            e.into()
        }
    }
}

async fn ensure_parent(path: &Path) -> BackendResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl LogFetcher for LocalBackend {
    async fn filter_events(&self, query: &LogQuery) -> BackendResult<Vec<LogEvent>> {
        let path = self.log_path(&query.log_group);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(not_found("log group", &query.log_group))?;

        let mut events = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: LogEvent = serde_json::from_str(line).map_err(|e| {
                BackendError(format!("{}:{}: {}", path.display(), lineno + 1, e))
            })?;
            if event.timestamp < query.start_time_ms || event.timestamp >= query.end_time_ms {
                continue;
            }
            events.push(event);
            if events.len() >= query.limit {
                break;
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl MetricFetcher for LocalBackend {
    async fn get_statistics(&self, query: &MetricQuery) -> BackendResult<Vec<MetricPoint>> {
        let path = self.metric_path(&query.namespace, &query.metric_name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            // unknown metrics have no datapoints
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let stored: Vec<StoredDatapoint> = serde_json::from_str(&text)?;
        Ok(stored
            .into_iter()
            .filter(|d| d.timestamp >= query.start_time && d.timestamp < query.end_time)
            .map(|d| d.point)
            .collect())
    }
}

#[async_trait]
impl BlobWriter for LocalBackend {
    async fn put_object(&self, request: &PutObject) -> BackendResult<String> {
        if checksum(&request.body) != request.checksum_sha256 {
            return Err(BackendError(format!(
                "BadDigest: checksum mismatch for {}",
                request.key
            )));
        }
        let path = self.blob_path(&request.bucket, &request.key)?;
        ensure_parent(&path).await?;
        tokio::fs::write(&path, &request.body).await?;
        Ok(format!("file://{}", path.display()))
    }
}

#[async_trait]
impl Notifier for LocalBackend {
    async fn publish(&self, request: &Publish) -> BackendResult<String> {
        let published_at = chrono::Utc::now().to_rfc3339();
        let id_source = format!(
            "{}|{}|{}|{}",
            request.topic, published_at, request.subject, request.message
        );
        let message_id = checksum(id_source.as_bytes())[..32].to_string();

        let record = PublishRecord {
            message_id: &message_id,
            published_at,
            subject: &request.subject,
            message: &request.message,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let path = self.notification_path(&request.topic);
        ensure_parent(&path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(message_id)
    }
}

#[async_trait]
impl ParameterSource for LocalBackend {
    async fn get_parameter(&self, name: &str, decrypt: bool) -> BackendResult<serde_json::Value> {
        // stored parameters are plaintext
        tracing::debug!(parameter = name, decrypt, "reading local parameter");
        let text = tokio::fs::read_to_string(self.parameter_path(name))
            .await
            .map_err(not_found("parameter", name))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn query(group: &str) -> LogQuery {
        LogQuery {
            log_group: group.into(),
            start_time_ms: 1000,
            end_time_ms: 4000,
            limit: 10_000,
        }
    }

    #[tokio::test]
    async fn reads_log_group_lines_within_window() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("logs")).unwrap();
        std::fs::write(
            dir.path().join("logs/aws_lambda_app.jsonl"),
            concat!(
                "{\"timestamp\":500,\"message\":\"old\",\"stream_id\":\"s\"}\n",
                "{\"timestamp\":1000,\"message\":\"ERROR: disk full\",\"stream_id\":\"s1\"}\n",
                "\n",
                "{\"timestamp\":3000,\"logStreamName\":\"s2\"}\n",
                "{\"timestamp\":4000,\"message\":\"too late\",\"stream_id\":\"s\"}\n",
            ),
        )
        .unwrap();

        let backend = LocalBackend::new(dir.path());
        let events = backend.filter_events(&query("/aws/lambda/app")).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], LogEvent::new(1000, "ERROR: disk full", "s1"));
        assert_eq!(events[1], LogEvent::new(3000, "", "s2"));
    }

    #[test]
    fn slash_and_underscore_names_share_a_file() {
        let backend = LocalBackend::new("/data");
        assert_eq!(backend.log_path("/aws/lambda/app"), backend.log_path("aws_lambda_app"));
    }

    #[tokio::test]
    async fn missing_log_group_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let err = backend.filter_events(&query("nope")).await.unwrap_err();
        assert!(err.0.contains("ResourceNotFoundException"));
    }

    #[tokio::test]
    async fn metrics_filter_by_window_and_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let mut q = MetricQuery {
            namespace: "AWS/Logs".into(),
            metric_name: "IncomingLogEvents".into(),
            dimensions: BTreeMap::new(),
            start_time: 0,
            end_time: 100,
            period_seconds: 86_400,
            statistics: vec![super::super::Statistic::Sum],
        };
        assert!(backend.get_statistics(&q).await.unwrap().is_empty());

        std::fs::create_dir_all(dir.path().join("metrics/AWS_Logs")).unwrap();
        std::fs::write(
            dir.path().join("metrics/AWS_Logs/IncomingLogEvents.json"),
            r#"[{"timestamp":10,"sum":100,"average":4.17},{"timestamp":500,"sum":1,"average":1}]"#,
        )
        .unwrap();
        q.end_time = 200;
        let points = backend.get_statistics(&q).await.unwrap();
        assert_eq!(points, vec![MetricPoint { sum: 100.0, average: 4.17 }]);
    }

    #[tokio::test]
    async fn put_object_writes_under_bucket_and_checks_digest() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let body = b"{}".to_vec();
        let mut request = PutObject {
            bucket: "reports".into(),
            key: "log-reviews/2024-03-01/daily-review.json".into(),
            checksum_sha256: checksum(&body),
            body,
            content_type: "application/json".into(),
        };
        let location = backend.put_object(&request).await.unwrap();
        assert!(location.ends_with("blobs/reports/log-reviews/2024-03-01/daily-review.json"));
        let stored = backend.read_object("reports", &request.key).await.unwrap();
        assert_eq!(stored, b"{}");

        request.checksum_sha256 = "00".into();
        let err = backend.put_object(&request).await.unwrap_err();
        assert!(err.0.starts_with("BadDigest"));
    }

    #[tokio::test]
    async fn put_object_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let body = b"x".to_vec();
        let request = PutObject {
            bucket: "reports".into(),
            key: "../outside".into(),
            checksum_sha256: checksum(&body),
            body,
            content_type: "text/plain".into(),
        };
        assert!(backend.put_object(&request).await.is_err());
    }

    #[tokio::test]
    async fn publish_appends_records() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path());
        let request = Publish {
            topic: "ops-alerts".into(),
            subject: "Daily Log Review".into(),
            message: "all quiet".into(),
        };
        let first = backend.publish(&request).await.unwrap();
        backend.publish(&request).await.unwrap();
        assert_eq!(first.len(), 32);

        let text = std::fs::read_to_string(dir.path().join("notifications/ops-alerts.jsonl")).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("all quiet"));
    }

    #[tokio::test]
    async fn parameters_are_read_as_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("parameters")).unwrap();
        std::fs::write(
            dir.path().join("parameters/logreview_config.json"),
            r#"{"topic":"t"}"#,
        )
        .unwrap();
        let backend = LocalBackend::new(dir.path());
        let value = backend.get_parameter("/logreview/config", true).await.unwrap();
        assert_eq!(value["topic"], "t");
    }
}
