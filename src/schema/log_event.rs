use serde::{Deserialize, Serialize};

/// one raw log record as delivered by the log backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default)]
    pub timestamp: i64, // epoch millis
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "logStreamName", alias = "stream")]
    pub stream_id: String,
}

impl LogEvent {
    pub fn new(timestamp: i64, message: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            stream_id: stream_id.into(),
        }
    }
}

/// one aggregation bucket from the metrics backend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricPoint {
    #[serde(default, alias = "Sum")]
    pub sum: f64,
    #[serde(default, alias = "Average")]
    pub average: f64,
}
