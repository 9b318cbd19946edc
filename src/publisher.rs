use crate::backend::{BlobWriter, Notifier, Publish, PutObject, checksum};
use crate::error::Result;
use crate::schema::report::Report;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "log-reviews";
pub const REPORT_FILE: &str = "daily-review.json";
pub const CONTENT_TYPE: &str = "application/json";
/// backend-enforced subject limit
pub const MAX_SUBJECT_CHARS: usize = 100;

/// outcome of one external publish step, reported as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepResult {
    Success { location: String },
    Error { error: String, resource: String },
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }
}

/// storage and notification results side by side; they are not atomic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub storage: StepResult,
    pub notification: StepResult,
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        self.storage.is_success() && self.notification.is_success()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub message: String,
}

/// where a report is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub prefix: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

pub fn report_key(prefix: &str, date: NaiveDate) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", date.format("%Y-%m-%d"), REPORT_FILE)
    } else {
        format!("{}/{}/{}", prefix, date.format("%Y-%m-%d"), REPORT_FILE)
    }
}

/// pretty JSON with two-space indent; keys follow the report's field order
pub fn render(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn parse(text: &str) -> Result<Report> {
    Ok(serde_json::from_str(text)?)
}

/// write the rendered report once; no retry
pub async fn store(writer: &dyn BlobWriter, destination: &Destination, report: &Report) -> StepResult {
    let key = report_key(&destination.prefix, report.report_date);
    let resource = format!("{}/{}", destination.bucket, key);

    let body = match render(report) {
        Ok(text) => text.into_bytes(),
        Err(e) => {
            return StepResult::Error {
                error: e.to_string(),
                resource,
            };
        }
    };
    let request = PutObject {
        bucket: destination.bucket.clone(),
        key,
        checksum_sha256: checksum(&body),
        body,
        content_type: CONTENT_TYPE.to_string(),
    };

    match writer.put_object(&request).await {
        Ok(location) => {
            tracing::info!(%location, bytes = request.body.len(), "report stored");
            StepResult::Success { location }
        }
        Err(e) => {
            tracing::error!(resource = %resource, error = %e, "report storage failed");
            StepResult::Error {
                error: e.to_string(),
                resource,
            }
        }
    }
}

/// condensed human-readable digest of a report
pub fn digest(report: &Report, location: Option<&str>) -> Notification {
    let date = report.report_date.format("%Y-%m-%d");
    let summary = &report.analysis_summary;

    let subject = truncate_chars(
        &format!(
            "Daily Log Review {} - {} errors, {} warnings",
            date, summary.error_count, summary.warning_count
        ),
        MAX_SUBJECT_CHARS,
    );

    let mut message = format!(
        "Daily log review for {}\n\n\
         Total events: {}\n\
         Errors: {}\n\
         Warnings: {}\n\
         Time range: {} to {}\n\
         Incoming events (24h): {}\n\
         Average events per hour: {:.2}\n\
         Critical events included: {}\n",
        date,
        summary.total_events,
        summary.error_count,
        summary.warning_count,
        summary.time_range.start,
        summary.time_range.end,
        report.metrics_summary.incoming_events_24h,
        report.metrics_summary.average_events_per_hour,
        report.critical_events.len(),
    );
    if let Some(location) = location {
        message.push_str(&format!("Full report: {}\n", location));
    }
    if let Ok(host) = hostname::get() {
        message.push_str(&format!("Generated on: {}\n", host.to_string_lossy()));
    }

    Notification { subject, message }
}

/// publish one digest message; independent of `store`
pub async fn notify(notifier: &dyn Notifier, topic: &str, notification: &Notification) -> StepResult {
    let request = Publish {
        topic: topic.to_string(),
        subject: notification.subject.clone(),
        message: notification.message.clone(),
    };
    match notifier.publish(&request).await {
        Ok(message_id) => {
            tracing::info!(topic, %message_id, "notification sent");
            StepResult::Success { location: message_id }
        }
        Err(e) => {
            tracing::error!(topic, error = %e, "notification failed");
            StepResult::Error {
                error: e.to_string(),
                resource: topic.to_string(),
            }
        }
    }
}

/// store, then notify regardless of the storage outcome
pub async fn publish(
    writer: &dyn BlobWriter,
    notifier: &dyn Notifier,
    destination: &Destination,
    topic: &str,
    report: &Report,
) -> PublishOutcome {
    let storage = store(writer, destination, report).await;
    let location = match &storage {
        StepResult::Success { location } => Some(location.as_str()),
        StepResult::Error { .. } => None,
    };
    let notification = notify(notifier, topic, &digest(report, location)).await;
    PublishOutcome { storage, notification }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{MemoryBlobStore, MemoryNotifier};
    use crate::schema::log_event::LogEvent;
    use crate::schema::report::{AnalysisSummary, MetricsSummary, TimeRange};
    use serde_json::json;

    fn report() -> Report {
        Report {
            report_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            analysis_summary: AnalysisSummary {
                total_events: 3,
                error_count: 1,
                warning_count: 1,
                time_range: TimeRange {
                    start: "2024-03-01 00:00:01".into(),
                    end: "2024-03-01 00:00:03".into(),
                },
            },
            critical_events: vec![LogEvent::new(1000, "ERROR: disk full", "s1")],
            metrics_summary: MetricsSummary {
                incoming_events_24h: 100.0,
                average_events_per_hour: 0.17375,
            },
            compliance_status: json!({"retention_days": 90, "encrypted": true}),
        }
    }

    #[test]
    fn key_is_date_partitioned() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(report_key("log-reviews", date), "log-reviews/2024-03-01/daily-review.json");
        assert_eq!(report_key("log-reviews/", date), "log-reviews/2024-03-01/daily-review.json");
        assert_eq!(report_key("", date), "2024-03-01/daily-review.json");
    }

    #[test]
    fn rendered_report_round_trips() {
        let original = report();
        let text = render(&original).unwrap();
        assert_eq!(parse(&text).unwrap(), original);
    }

    #[test]
    fn nan_metrics_survive_the_round_trip() {
        let mut original = report();
        original.metrics_summary = crate::metrics::summarize(&[crate::schema::log_event::MetricPoint {
            sum: 1.0,
            average: f64::NAN,
        }]);
        let text = render(&original).unwrap();
        assert!(text.contains("\"average_events_per_hour\": null"));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.metrics_summary.incoming_events_24h, 1.0);
        assert!(parsed.metrics_summary.average_events_per_hour.is_nan());
        assert_eq!(parsed.analysis_summary, original.analysis_summary);
        assert_eq!(parsed.critical_events, original.critical_events);
        assert_eq!(parsed.compliance_status, original.compliance_status);
        assert_eq!(parsed.report_date, original.report_date);
    }

    #[test]
    fn rendering_is_indented_with_stable_key_order() {
        let text = render(&report()).unwrap();
        assert!(text.starts_with("{\n  \"report_date\": \"2024-03-01\""));
        let positions: Vec<_> = [
            "\"analysis_summary\"",
            "\"critical_events\"",
            "\"metrics_summary\"",
            "\"compliance_status\"",
        ]
        .iter()
        .map(|k| text.find(k).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.find("\"encrypted\"").unwrap() < text.find("\"retention_days\"").unwrap());
    }

    #[test]
    fn subject_is_capped_and_names_the_date() {
        let n = digest(&report(), Some("memory://b/k"));
        assert!(n.subject.contains("2024-03-01"));
        assert!(n.subject.chars().count() <= MAX_SUBJECT_CHARS);
        assert!(n.message.contains("Errors: 1"));
        assert!(n.message.contains("Full report: memory://b/k"));

        assert_eq!(truncate_chars(&"é".repeat(150), MAX_SUBJECT_CHARS).chars().count(), 100);
    }

    #[tokio::test]
    async fn store_writes_once_under_dated_key() {
        let blobs = MemoryBlobStore::new();
        let result = store(&blobs, &Destination::new("reports", DEFAULT_PREFIX), &report()).await;
        assert_eq!(
            result,
            StepResult::Success {
                location: "memory://reports/log-reviews/2024-03-01/daily-review.json".into()
            }
        );
        let object = blobs.get("reports", "log-reviews/2024-03-01/daily-review.json").unwrap();
        assert_eq!(object.content_type, CONTENT_TYPE);
        assert_eq!(object.checksum_sha256, checksum(&object.body));
    }

    #[tokio::test]
    async fn notify_runs_even_when_storage_fails() {
        let blobs = MemoryBlobStore::failing("AccessDenied");
        let notifier = MemoryNotifier::new();
        let outcome = publish(&blobs, &notifier, &Destination::new("reports", DEFAULT_PREFIX), "ops", &report()).await;

        assert!(!outcome.storage.is_success());
        assert!(outcome.notification.is_success());
        assert!(!outcome.is_success());
        assert_eq!(notifier.sent().len(), 1);
        assert!(!notifier.sent()[0].message.contains("Full report"));
    }

    #[tokio::test]
    async fn both_failures_are_reported() {
        let blobs = MemoryBlobStore::failing("AccessDenied");
        let notifier = MemoryNotifier::failing("AuthorizationError");
        let outcome = publish(&blobs, &notifier, &Destination::new("reports", DEFAULT_PREFIX), "ops", &report()).await;

        assert_eq!(
            outcome.storage,
            StepResult::Error {
                error: "AccessDenied".into(),
                resource: "reports/log-reviews/2024-03-01/daily-review.json".into()
            }
        );
        assert_eq!(
            outcome.notification,
            StepResult::Error { error: "AuthorizationError".into(), resource: "ops".into() }
        );
    }
}
