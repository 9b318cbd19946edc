use crate::backend::ParameterSource;
use crate::classifier::SeverityPatternSet;
use crate::error::{Result, ReviewError};
use crate::publisher::DEFAULT_PREFIX;
use crate::util::cache::TtlCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// top-level config for logreview
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub review: ReviewConfig,
    pub metrics: MetricsConfig,
    pub storage: StorageConfig,
    pub notify: NotifyConfig,
    pub backend: BackendConfig,
    pub parameter: ParameterConfig,
    /// attached to every report verbatim
    pub compliance_status: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String, // error|warn|info|debug|trace
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub log_groups: Vec<String>,
    pub lookback_hours: u32,
    pub run_timeout_secs: u64,
    pub patterns: Option<SeverityPatternSet>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            log_groups: Vec::new(),
            lookback_hours: 24,
            run_timeout_secs: 300,
            patterns: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: BTreeMap<String, String>,
    pub period_seconds: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespace: "AWS/Logs".to_string(),
            metric_name: "IncomingLogEvents".to_string(),
            dimensions: BTreeMap::new(),
            period_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotifyConfig {
    pub topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub data_dir: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { data_dir: home_dir().join(".logreview").join("data") }
    }
}

/// centralized settings document in the parameter store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterConfig {
    pub name: Option<String>,
    pub decrypt: bool,
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            name: None,
            decrypt: true,
            cache_ttl_secs: 300,
            cache_capacity: 16,
        }
    }
}

/// fields the centralized document may override
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CentralSettings {
    log_groups: Option<Vec<String>>,
    topic: Option<String>,
    patterns: Option<SeverityPatternSet>,
    compliance_status: Option<serde_json::Value>,
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

impl Config {
    /// load config from a toml file, then overlay with env vars (LOGREVIEW_*)
    ///
    /// An explicit path must exist; the default `~/.logreview/logreview.toml`
    /// may be absent.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(Path::new(p))?.ok_or_else(|| {
                ReviewError::Configuration(format!("config file not found: {}", p))
            })?,
            None => {
                let default_path = home_dir().join(".logreview").join("logreview.toml");
                Self::from_file(&default_path)?.unwrap_or_default()
            }
        };

        cfg.overlay_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        toml::from_str(&text)
            .map(Some)
            .map_err(|e| ReviewError::Configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn overlay_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("LOGREVIEW_LOG_LEVEL") { self.logging.level = level; }
        if let Some(v) = lookup("LOGREVIEW_DATA_DIR") { self.backend.data_dir = PathBuf::from(v); }
        if let Some(v) = lookup("LOGREVIEW_BUCKET") { self.storage.bucket = v; }
        if let Some(v) = lookup("LOGREVIEW_TOPIC") { self.notify.topic = v; }
        if let Some(v) = lookup("LOGREVIEW_PARAMETER") { self.parameter.name = Some(v); }
        if let Some(v) = lookup("LOGREVIEW_LOG_GROUPS") {
            self.review.log_groups = v
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// overlay the centralized settings document
    pub fn apply_central(&mut self, document: &serde_json::Value) -> Result<()> {
        let central: CentralSettings = serde_json::from_value(document.clone())
            .map_err(|e| ReviewError::Configuration(format!("malformed central config: {}", e)))?;

        if let Some(groups) = central.log_groups { self.review.log_groups = groups; }
        if let Some(topic) = central.topic { self.notify.topic = topic; }
        if let Some(patterns) = central.patterns { self.review.patterns = Some(patterns); }
        if let Some(status) = central.compliance_status { self.compliance_status = Some(status); }
        Ok(())
    }

    /// fetch the centralized document once, reusing the caller's cache
    pub async fn load_central(
        &mut self,
        source: &dyn ParameterSource,
        cache: &mut TtlCache<serde_json::Value>,
    ) -> Result<()> {
        let Some(name) = self.parameter.name.clone() else {
            return Ok(());
        };

        let document = match cache.get(&name) {
            Some(doc) => doc,
            None => {
                let doc = source
                    .get_parameter(&name, self.parameter.decrypt)
                    .await
                    .map_err(|e| ReviewError::backend("get_parameter", &name, e.to_string()))?;
                cache.insert(&name, doc.clone());
                doc
            }
        };
        tracing::debug!(parameter = %name, "applying centralized config");
        self.apply_central(&document)
    }

    pub fn validate(&self) -> Result<()> {
        if self.review.log_groups.is_empty() {
            return Err(ReviewError::Configuration("no log groups configured".into()));
        }
        if self.review.log_groups.iter().any(|g| g.trim().is_empty()) {
            return Err(ReviewError::Configuration("empty log group name".into()));
        }
        if self.storage.bucket.is_empty() {
            return Err(ReviewError::Configuration("storage.bucket is not set".into()));
        }
        if self.notify.topic.is_empty() {
            return Err(ReviewError::Configuration("notify.topic is not set".into()));
        }
        if self.metrics.period_seconds == 0 {
            return Err(ReviewError::Configuration("metrics.period_seconds must be positive".into()));
        }
        if self.review.lookback_hours == 0 {
            return Err(ReviewError::Configuration("review.lookback_hours must be positive".into()));
        }
        if self.review.run_timeout_secs == 0 {
            return Err(ReviewError::Configuration("review.run_timeout_secs must be positive".into()));
        }
        if matches!(&self.review.patterns, Some(p) if p.is_empty()) {
            return Err(ReviewError::Configuration("review.patterns is empty".into()));
        }
        Ok(())
    }

    pub fn patterns(&self) -> SeverityPatternSet {
        self.review.patterns.clone().unwrap_or_default()
    }

    pub fn compliance_status(&self) -> serde_json::Value {
        self.compliance_status
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(Default::default()))
    }
}
