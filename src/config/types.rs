use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for watchlist
///
/// Every section has defaults, so an absent config file behaves like an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub batch: BatchConfig,
    pub paths: PathsConfig,
}

/// Fetch engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker threads running the network reactor
    pub workers: usize,

    /// HTTP protocol version used in request lines ("1.0" or "1.1")
    #[serde(rename = "http-version")]
    pub http_version: String,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Upper bound for each network stage of a fetch (milliseconds)
    #[serde(rename = "stage-timeout-ms")]
    pub stage_timeout_ms: Option<u64>,
}

impl EngineConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: crate::fetch::DEFAULT_WORKERS,
            http_version: "1.1".to_string(),
            user_agent: concat!("watchlist/", env!("CARGO_PKG_VERSION")).to_string(),
            stage_timeout_ms: None,
        }
    }
}

/// How the batch reacts to a failed fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// The first failed fetch aborts the batch; history is not saved
    #[default]
    FailFast,

    /// Failed queries are logged and skipped; the batch continues
    BestEffort,
}

/// Batch behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,

    /// Maximum number of items reported per query on a first run
    #[serde(rename = "first-run-cap")]
    pub first_run_cap: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            first_run_cap: crate::batch::MAX_FIRST_RUN_ITEMS,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Default directory for input lists and watch-history files
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Directory where rendered reports are written
    #[serde(rename = "report-dir")]
    pub report_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            report_dir: PathBuf::from("./data"),
        }
    }
}
