use crate::backend::{LogFetcher, LogQuery, MAX_PAGE_EVENTS};
use crate::schema::log_event::LogEvent;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// half-open interval `[start_ms, end_ms)` in epoch millis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl ReportWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// the `hours` leading up to `end`
    pub fn trailing(end: DateTime<Local>, hours: u32) -> Self {
        let start = end - Duration::hours(i64::from(hours));
        Self::new(start.timestamp_millis(), end.timestamp_millis())
    }

    /// the local calendar day `date`, midnight to midnight
    pub fn for_day(date: NaiveDate) -> Option<Self> {
        let start = Local
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .earliest()?;
        let next = date.succ_opt()?;
        let end = Local
            .from_local_datetime(&next.and_hms_opt(0, 0, 0)?)
            .earliest()?;
        Some(Self::new(start.timestamp_millis(), end.timestamp_millis()))
    }
}

/// outcome of one log fetch, reported as data rather than as an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FetchResult {
    Success { events: Vec<LogEvent>, count: usize },
    Error { error: String, log_group: String },
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }
}

/// fetch one page of events for `log_group`; no retry, no pagination
pub async fn read_events(
    fetcher: &dyn LogFetcher,
    log_group: &str,
    window: ReportWindow,
) -> FetchResult {
    let query = LogQuery {
        log_group: log_group.to_string(),
        start_time_ms: window.start_ms,
        end_time_ms: window.end_ms,
        limit: MAX_PAGE_EVENTS,
    };

    match fetcher.filter_events(&query).await {
        Ok(mut events) => {
            events.truncate(MAX_PAGE_EVENTS);
            let count = events.len();
            tracing::info!(log_group, count, "retrieved log events");
            if count == MAX_PAGE_EVENTS {
                tracing::warn!(log_group, "page cap reached, later events are not included");
            }
            FetchResult::Success { events, count }
        }
        Err(e) => {
            tracing::error!(log_group, error = %e, "log retrieval failed");
            FetchResult::Error {
                error: e.to_string(),
                log_group: log_group.to_string(),
            }
        }
    }
}
