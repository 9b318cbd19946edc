use crate::schema::log_event::LogEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ERROR_CATEGORY: &str = "error";
pub const WARNING_CATEGORY: &str = "warning";

/// severity category -> substring markers, matched case-sensitively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityPatternSet {
    categories: BTreeMap<String, Vec<String>>,
}

impl Default for SeverityPatternSet {
    fn default() -> Self {
        Self::from_pairs([
            ("error", &["ERROR", "CRITICAL", "FATAL"][..]),
            ("warning", &["WARN", "WARNING"][..]),
            ("info", &["INFO"][..]),
            ("debug", &["DEBUG"][..]),
        ])
    }
}

impl SeverityPatternSet {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        let categories = pairs
            .into_iter()
            .map(|(name, markers)| {
                (
                    name.to_string(),
                    markers.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect();
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(name, markers)| (name.as_str(), markers.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// first/last timestamp seen, in iteration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimestampRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_events: u64,
    pub severity_counts: BTreeMap<String, u64>,
    pub critical_events: Vec<LogEvent>,
    pub timestamp_range: TimestampRange,
}

impl AnalysisResult {
    fn empty(patterns: &SeverityPatternSet) -> Self {
        Self {
            total_events: 0,
            severity_counts: patterns.categories().map(|(name, _)| (name.to_string(), 0)).collect(),
            critical_events: Vec::new(),
            timestamp_range: TimestampRange::default(),
        }
    }

    pub fn count(&self, category: &str) -> u64 {
        self.severity_counts.get(category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }
}

/// classify every event exactly once, in input order
///
/// The range is not sorted: `start` is the first event's timestamp and `end`
/// the last one's, even when the input is out of order.
pub fn classify(events: &[LogEvent], patterns: &SeverityPatternSet) -> AnalysisResult {
    let mut result = AnalysisResult::empty(patterns);

    for event in events {
        result.total_events += 1;

        for (category, markers) in patterns.categories() {
            if !markers.iter().any(|m| event.message.contains(m.as_str())) {
                continue;
            }
            if let Some(count) = result.severity_counts.get_mut(category) {
                *count += 1;
            }
            if category == ERROR_CATEGORY {
                result.critical_events.push(event.clone());
            }
        }

        if result.timestamp_range.start.is_none() {
            result.timestamp_range.start = Some(event.timestamp);
        }
        result.timestamp_range.end = Some(event.timestamp);
    }

    tracing::debug!(
        total = result.total_events,
        errors = result.count(ERROR_CATEGORY),
        "classified events"
    );
    result
}
