//! One review run: retrieve, classify, summarize, assemble, publish.
//!
//! Every stage awaits its backend call before the next one starts. When
//! several log groups are configured, each group is fetched on its own task
//! and all tasks are joined before classification; a single failed group
//! fails the whole run and nothing is published.

use crate::assembler;
use crate::backend::{BlobWriter, LogFetcher, MetricFetcher, MetricQuery, Notifier, Statistic};
use crate::classifier::{self, AnalysisResult, SeverityPatternSet};
use crate::config::{Config, MetricsConfig};
use crate::error::{Result, ReviewError};
use crate::metrics;
use crate::publisher::{self, Destination, PublishOutcome};
use crate::reader::{self, FetchResult, ReportWindow};
use crate::schema::log_event::{LogEvent, MetricPoint};
use crate::schema::report::Report;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// backend handles the pipeline calls through
#[derive(Clone)]
pub struct Backends {
    pub logs: Arc<dyn LogFetcher>,
    pub metrics: Arc<dyn MetricFetcher>,
    pub blobs: Arc<dyn BlobWriter>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub log_groups: Vec<String>,
    pub patterns: SeverityPatternSet,
    pub metrics: MetricsConfig,
    pub destination: Destination,
    pub topic: String,
    pub compliance_status: serde_json::Value,
    pub lookback_hours: u32,
}

impl PipelineSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            log_groups: cfg.review.log_groups.clone(),
            patterns: cfg.patterns(),
            metrics: cfg.metrics.clone(),
            destination: Destination::new(cfg.storage.bucket.clone(), cfg.storage.prefix.clone()),
            topic: cfg.notify.topic.clone(),
            compliance_status: cfg.compliance_status(),
            lookback_hours: cfg.review.lookback_hours,
        }
    }
}

/// a completed run: the assembled report and both publish results
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub analysis: AnalysisResult,
    pub publish: PublishOutcome,
}

pub struct ReviewPipeline {
    backends: Backends,
    settings: PipelineSettings,
}

impl ReviewPipeline {
    pub fn new(backends: Backends, settings: PipelineSettings) -> Self {
        Self { backends, settings }
    }

    /// review the trailing lookback window ending now, stamped with today's date
    pub async fn run_latest(&self) -> Result<RunOutcome> {
        let now = Local::now();
        let window = ReportWindow::trailing(now, self.settings.lookback_hours);
        self.run(now.date_naive(), window).await
    }

    /// review the local calendar day `date`
    pub async fn run_for_day(&self, date: NaiveDate) -> Result<RunOutcome> {
        let window = ReportWindow::for_day(date)
            .ok_or_else(|| ReviewError::Formatting(format!("no local midnight for {}", date)))?;
        self.run(date, window).await
    }

    /// run for `date` (or the trailing window) within `budget`
    ///
    /// On expiry the in-flight run is dropped, so nothing is published.
    pub async fn run_within(&self, date: Option<NaiveDate>, budget: Duration) -> Result<RunOutcome> {
        let run = async {
            match date {
                Some(day) => self.run_for_day(day).await,
                None => self.run_latest().await,
            }
        };
        match tokio::time::timeout(budget, run).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(?budget, "run abandoned after exceeding its budget");
                Err(ReviewError::Timeout(budget))
            }
        }
    }

    pub async fn run(&self, report_date: NaiveDate, window: ReportWindow) -> Result<RunOutcome> {
        tracing::info!(
            %report_date,
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            groups = self.settings.log_groups.len(),
            "starting log review"
        );

        let events = self.fetch_all(window).await?;
        let analysis = classifier::classify(&events, &self.settings.patterns);
        let summary = metrics::summarize(&self.fetch_metrics(window).await?);

        let report = assembler::assemble_on(
            report_date,
            &analysis,
            summary,
            &self.settings.compliance_status,
        )?;

        let publish = publisher::publish(
            self.backends.blobs.as_ref(),
            self.backends.notifier.as_ref(),
            &self.settings.destination,
            &self.settings.topic,
            &report,
        )
        .await;

        Ok(RunOutcome {
            report,
            analysis,
            publish,
        })
    }

    async fn fetch_all(&self, window: ReportWindow) -> Result<Vec<LogEvent>> {
        let groups = &self.settings.log_groups;
        if groups.len() == 1 {
            return into_events(reader::read_events(self.backends.logs.as_ref(), &groups[0], window).await);
        }

        let mut tasks = JoinSet::new();
        for (index, group) in groups.iter().enumerate() {
            let logs = Arc::clone(&self.backends.logs);
            let group = group.clone();
            tasks.spawn(async move { (index, reader::read_events(logs.as_ref(), &group, window).await) });
        }

        let mut results: Vec<Option<FetchResult>> = vec![None; groups.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined
                .map_err(|e| ReviewError::backend("filter_log_events", "log group task", e.to_string()))?;
            results[index] = Some(result);
        }

        // concatenate in configured group order
        let mut events = Vec::new();
        for result in results.into_iter().flatten() {
            events.extend(into_events(result)?);
        }
        Ok(events)
    }

    async fn fetch_metrics(&self, window: ReportWindow) -> Result<Vec<MetricPoint>> {
        let cfg = &self.settings.metrics;
        let query = MetricQuery {
            namespace: cfg.namespace.clone(),
            metric_name: cfg.metric_name.clone(),
            dimensions: cfg.dimensions.clone(),
            start_time: window.start_ms,
            end_time: window.end_ms,
            period_seconds: cfg.period_seconds,
            statistics: vec![Statistic::Sum, Statistic::Average],
        };
        let resource = format!("{}/{}", cfg.namespace, cfg.metric_name);
        match self.backends.metrics.get_statistics(&query).await {
            Ok(points) => {
                tracing::info!(metric = %resource, datapoints = points.len(), "retrieved metrics");
                Ok(points)
            }
            Err(e) => {
                tracing::error!(metric = %resource, error = %e, "metric retrieval failed");
                Err(ReviewError::backend("get_metric_statistics", &resource, e.to_string()))
            }
        }
    }
}

fn into_events(result: FetchResult) -> Result<Vec<LogEvent>> {
    match result {
        FetchResult::Success { events, .. } => Ok(events),
        FetchResult::Error { error, log_group } => {
            Err(ReviewError::backend("filter_log_events", &log_group, error))
        }
    }
}
