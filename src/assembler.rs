use crate::classifier::{AnalysisResult, ERROR_CATEGORY, WARNING_CATEGORY};
use crate::error::{Result, ReviewError};
use crate::schema::report::{AnalysisSummary, MetricsSummary, Report, TimeRange};
use chrono::{Local, NaiveDate, TimeZone};

/// critical events kept in a persisted report
pub const MAX_REPORT_CRITICAL_EVENTS: usize = 10;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// build the report for today's local date
pub fn assemble(
    analysis: &AnalysisResult,
    metrics: MetricsSummary,
    compliance_status: &serde_json::Value,
) -> Result<Report> {
    assemble_on(Local::now().date_naive(), analysis, metrics, compliance_status)
}

/// build the report stamped with `report_date`
///
/// Fails with `ReviewError::Formatting` when the analysis covered no events,
/// since there is no time range to render.
pub fn assemble_on(
    report_date: NaiveDate,
    analysis: &AnalysisResult,
    metrics: MetricsSummary,
    compliance_status: &serde_json::Value,
) -> Result<Report> {
    let range = analysis.timestamp_range;
    let (start, end) = match (range.start, range.end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(ReviewError::Formatting(
                "time range is unset; no events were analysed".to_string(),
            ));
        }
    };

    let critical_events = analysis
        .critical_events
        .iter()
        .take(MAX_REPORT_CRITICAL_EVENTS)
        .cloned()
        .collect();

    Ok(Report {
        report_date,
        analysis_summary: AnalysisSummary {
            total_events: analysis.total_events,
            error_count: analysis.count(ERROR_CATEGORY),
            warning_count: analysis.count(WARNING_CATEGORY),
            time_range: TimeRange {
                start: render_local(start)?,
                end: render_local(end)?,
            },
        },
        critical_events,
        metrics_summary: metrics,
        compliance_status: compliance_status.clone(),
    })
}

fn render_local(millis: i64) -> Result<String> {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .ok_or_else(|| ReviewError::Formatting(format!("timestamp {} is out of range", millis)))
}
