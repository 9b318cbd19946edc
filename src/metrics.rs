use crate::schema::log_event::MetricPoint;
use crate::schema::report::MetricsSummary;

const HOURS_PER_DAY: f64 = 24.0;

/// aggregate datapoints for the window; values are not validated
pub fn summarize(points: &[MetricPoint]) -> MetricsSummary {
    if points.is_empty() {
        return MetricsSummary::default();
    }

    let total: f64 = points.iter().map(|p| p.sum).sum();
    let averages: f64 = points.iter().map(|p| p.average).sum();

    MetricsSummary {
        incoming_events_24h: total,
        average_events_per_hour: averages / HOURS_PER_DAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_reference_values() {
        let summary = summarize(&[MetricPoint { sum: 100.0, average: 4.17 }]);
        assert_eq!(summary.incoming_events_24h, 100.0);
        assert!((summary.average_events_per_hour - 0.17375).abs() < 1e-9);
    }

    #[test]
    fn empty_list_is_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.incoming_events_24h, 0.0);
        assert_eq!(summary.average_events_per_hour, 0.0);
    }

    #[test]
    fn sums_across_buckets() {
        let summary = summarize(&[
            MetricPoint { sum: 10.0, average: 24.0 },
            MetricPoint { sum: 5.0, average: 24.0 },
        ]);
        assert_eq!(summary.incoming_events_24h, 15.0);
        assert_eq!(summary.average_events_per_hour, 2.0);
    }

    #[test]
    fn negative_and_nan_pass_through() {
        let summary = summarize(&[MetricPoint { sum: -3.0, average: f64::NAN }]);
        assert_eq!(summary.incoming_events_24h, -3.0);
        assert!(summary.average_events_per_hour.is_nan());
    }
}
