use crate::schema::log_event::LogEvent;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// persisted daily review document; field order is the on-disk key order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_date: NaiveDate, // serialized as YYYY-MM-DD
    pub analysis_summary: AnalysisSummary,
    pub critical_events: Vec<LogEvent>,
    pub metrics_summary: MetricsSummary,
    pub compliance_status: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_events: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub time_range: TimeRange,
}

/// local, human-readable bounds of the analysed window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// non-finite values are written as `null` and read back as NaN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricsSummary {
    #[serde(deserialize_with = "nan_from_null")]
    pub incoming_events_24h: f64,
    #[serde(deserialize_with = "nan_from_null")]
    pub average_events_per_hour: f64,
}

fn nan_from_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
