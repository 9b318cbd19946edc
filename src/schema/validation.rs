use super::report::Report;
use crate::assembler::MAX_REPORT_CRITICAL_EVENTS;

/// validate a parsed Report for the constraints the pipeline guarantees
pub fn validate_report(report: &Report) -> Result<(), String> {
    let summary = &report.analysis_summary;

    if summary.error_count > summary.total_events {
        return Err(format!(
            "error_count {} exceeds total_events {}",
            summary.error_count, summary.total_events
        ));
    }
    if summary.warning_count > summary.total_events {
        return Err(format!(
            "warning_count {} exceeds total_events {}",
            summary.warning_count, summary.total_events
        ));
    }

    if report.critical_events.len() > MAX_REPORT_CRITICAL_EVENTS {
        return Err(format!(
            "too many critical events: {}",
            report.critical_events.len()
        ));
    }
    if report.critical_events.len() as u64 > summary.error_count {
        return Err("critical_events exceeds error_count".to_string());
    }

    if summary.time_range.start.is_empty() {
        return Err("time_range.start is empty".to_string());
    }
    if summary.time_range.end.is_empty() {
        return Err("time_range.end is empty".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::log_event::LogEvent;
    use crate::schema::report::{AnalysisSummary, MetricsSummary, TimeRange};
    use chrono::NaiveDate;

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
            metrics_summary: MetricsSummary::default(),
            compliance_status: serde_json::json!({}),
        }
    }

    #[test]
    fn well_formed_report_passes() {
        assert!(validate_report(&report()).is_ok());
    }

    #[test]
    fn counts_above_total_are_rejected() {
        let mut r = report();
        r.analysis_summary.error_count = 9;
        let err = validate_report(&r).unwrap_err();
        assert!(err.contains("error_count"));
    }

    #[test]
    fn oversized_critical_list_is_rejected() {
        let mut r = report();
        r.analysis_summary.total_events = 20;
        r.analysis_summary.error_count = 20;
        r.critical_events = (0..11).map(|i| LogEvent::new(i, "ERROR", "s")).collect();
        assert!(validate_report(&r).is_err());
    }

    #[test]
    fn empty_time_range_is_rejected() {
        let mut r = report();
        r.analysis_summary.time_range.end.clear();
        assert_eq!(validate_report(&r).unwrap_err(), "time_range.end is empty");
    }
}
