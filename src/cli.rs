use crate::backend::local::LocalBackend;
use crate::classifier;
use crate::config::Config;
use crate::error::{Result, ReviewError};
use crate::pipeline::{Backends, PipelineSettings, ReviewPipeline};
use crate::publisher::{self, PublishOutcome, StepResult};
use crate::schema::log_event::LogEvent;
use crate::schema::validation::validate_report;
use crate::util::cache::TtlCache;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// CLI configuration for logreview
#[derive(Parser, Debug, Clone)]
#[command(name = "logreview")]
#[command(author, version, about = "Daily log review: classify, summarize, store, notify", long_about = None)]
pub struct Cli {
    /// enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// path to config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: ReviewCommands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReviewCommands {
    /// Run the review pipeline and publish the report
    Run {
        /// review this local calendar day instead of the trailing window
        #[arg(short, long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// log group to review; repeat to override the configured list
        #[arg(short = 'g', long = "log-group")]
        log_groups: Vec<String>,
    },

    /// Classify events from a JSON or JSON-lines file and print the analysis
    Analyze {
        /// file of log events
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print a stored report after validating it
    Show {
        /// report date (YYYY-MM-DD)
        #[arg(short, long, value_parser = parse_date)]
        date: NaiveDate,
    },
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date {:?}: {}", s, e))
}

impl Cli {
    /// parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// handle the subcommand execution
    pub async fn handle_command(&self, cfg: Config) -> Result<()> {
        match &self.command {
            ReviewCommands::Run { date, log_groups } => {
                tracing::debug!("running log review");
                self.handle_run(cfg, *date, log_groups).await
            }
            ReviewCommands::Analyze { input } => {
                tracing::debug!(input = %input.display(), "analyzing event file");
                self.handle_analyze(&cfg, input).await
            }
            ReviewCommands::Show { date } => {
                tracing::debug!(%date, "showing stored report");
                self.handle_show(&cfg, *date).await
            }
        }
    }

    async fn handle_run(&self, mut cfg: Config, date: Option<NaiveDate>, log_groups: &[String]) -> Result<()> {
        let backend = Arc::new(LocalBackend::new(cfg.backend.data_dir.clone()));

        // the cache lives for this process only
        let mut cache = TtlCache::new(
            cfg.parameter.cache_capacity,
            Duration::from_secs(cfg.parameter.cache_ttl_secs),
        );
        cfg.load_central(backend.as_ref(), &mut cache).await?;

        if !log_groups.is_empty() {
            cfg.review.log_groups = log_groups.to_vec();
        }
        cfg.validate()?;

        let backends = Backends {
            logs: backend.clone(),
            metrics: backend.clone(),
            blobs: backend.clone(),
            notifier: backend,
        };
        let pipeline = ReviewPipeline::new(backends, PipelineSettings::from_config(&cfg));

        let budget = Duration::from_secs(cfg.review.run_timeout_secs);
        let outcome = pipeline.run_within(date, budget).await?;

        println!("{}", serde_json::to_string_pretty(&outcome.publish)?);
        check_publish(&outcome.publish, outcome.report.report_date)
    }

    async fn handle_analyze(&self, cfg: &Config, input: &Path) -> Result<()> {
        let text = tokio::fs::read_to_string(input).await?;
        let events = parse_events(&text)?;
        let analysis = classifier::classify(&events, &cfg.patterns());
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        Ok(())
    }

    async fn handle_show(&self, cfg: &Config, date: NaiveDate) -> Result<()> {
        let backend = LocalBackend::new(cfg.backend.data_dir.clone());
        let key = publisher::report_key(&cfg.storage.prefix, date);
        let body = backend
            .read_object(&cfg.storage.bucket, &key)
            .await
            .map_err(|e| ReviewError::backend("get_object", &key, e.to_string()))?;

        let report = publisher::parse(&String::from_utf8_lossy(&body))?;
        validate_report(&report)
            .map_err(|e| ReviewError::Formatting(format!("{}: {}", key, e)))?;
        println!("{}", publisher::render(&report)?);
        Ok(())
    }
}

/// accept a JSON array of events or one event per line
pub fn parse_events(text: &str) -> Result<Vec<LogEvent>> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(ReviewError::from))
        .collect()
}

/// surface every failed publish step
fn check_publish(outcome: &PublishOutcome, report_date: NaiveDate) -> Result<()> {
    let failures: Vec<String> = [
        ("storage", &outcome.storage),
        ("notification", &outcome.notification),
    ]
    .into_iter()
    .filter_map(|(step, result)| match result {
        StepResult::Error { error, resource } => Some(format!("{} ({}): {}", step, resource, error)),
        StepResult::Success { .. } => None,
    })
    .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReviewError::backend(
            "publish",
            &report_date.to_string(),
            failures.join("; "),
        ))
    }
}
