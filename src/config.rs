//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directory, concurrency, bounds)
///
/// Groups settings related to how jobs are admitted and bounded.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrently executing jobs (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Maximum artifact size in bytes (default: 500 MiB)
    ///
    /// Enforced twice: against the size the extractor reports during the
    /// preflight inspect, and against the actual file after download.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,

    /// Wall-clock budget for one job's extraction in seconds (default: 600)
    ///
    /// Wraps the whole extractor invocation (inspect + download) so a single
    /// job cannot hold an admission permit indefinitely.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_jobs: default_max_concurrent(),
            max_file_size_bytes: default_max_file_size(),
            job_timeout_secs: default_job_timeout(),
        }
    }
}

/// Extractor binary configuration
///
/// Groups settings for the external yt-dlp binary and the knobs passed
/// through to it. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExtractorConfig {
    /// Path to the yt-dlp executable (auto-detected from PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for the binary if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Socket timeout passed to the extractor in seconds (default: 30)
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u64,

    /// Transient-error retry count passed to the extractor (default: 3)
    ///
    /// Retries happen inside the extractor process; the orchestrator itself
    /// never retries a job.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            socket_timeout_secs: default_socket_timeout(),
            retries: default_retries(),
        }
    }
}

/// Terminal-record retention configuration
///
/// Completed and failed records (and their artifacts) are evicted once they
/// have been terminal for longer than the TTL, bounding memory and disk use
/// over long deployments. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetentionConfig {
    /// Seconds to keep a record after it reaches a terminal status
    /// (default: 21600 = 6 hours; None disables eviction)
    #[serde(default = "default_retention_ttl")]
    pub ttl_secs: Option<u64>,

    /// Interval between sweeper passes in seconds (default: 300)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Also delete the artifact file when evicting a completed record (default: true)
    #[serde(default = "default_true")]
    pub delete_artifacts: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_retention_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            delete_artifacts: true,
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address for the API server (default: 127.0.0.1:8090)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins ("*" for any; default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: false,
        }
    }
}

/// Main configuration for [`MediaDownloader`](crate::MediaDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — directory, concurrency, size/time bounds
/// - [`extractor`](ExtractorConfig) — yt-dlp binary and pass-through knobs
/// - [`retention`](RetentionConfig) — terminal-record eviction
/// - [`api`](ApiConfig) — REST server
///
/// Download, extractor, and retention fields are flattened for a flat
/// JSON/TOML format; the API server settings live under an `api` key.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Extractor binary settings
    #[serde(flatten)]
    pub extractor: ExtractorConfig,

    /// Terminal-record retention settings
    #[serde(flatten)]
    pub retention: RetentionConfig,

    /// REST API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

// Convenience accessors for the duration-typed views of the second-based
// wire fields.
impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Per-job wall-clock extraction budget
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.download.job_timeout_secs)
    }

    /// Extractor socket timeout
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor.socket_timeout_secs)
    }

    /// Retention TTL, if eviction is enabled
    pub fn retention_ttl(&self) -> Option<Duration> {
        self.retention.ttl_secs.map(Duration::from_secs)
    }

    /// Interval between retention sweeper passes
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention.sweep_interval_secs)
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    500 * 1024 * 1024
}

fn default_job_timeout() -> u64 {
    600
}

fn default_socket_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retention_ttl() -> Option<u64> {
    Some(6 * 60 * 60)
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_bind_address() -> SocketAddr {
    // Port chosen to avoid common dev-server ranges
    "127.0.0.1:8090".parse().unwrap_or_else(|_| {
        SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST), 8090)
    })
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}
