//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a download job
///
/// A v4 UUID generated at submission time. The id is the sole key into the
/// job store and doubles as the on-disk filename prefix for the artifact,
/// which keeps concurrent jobs from ever writing the same path.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh job identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner Uuid value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Accepted, waiting for an admission permit
    Queued,
    /// Extraction in flight
    Processing,
    /// Artifact downloaded and validated
    Completed,
    /// Failed with a classified error
    Failed,
}

impl Status {
    /// Whether this status is terminal (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    /// Lowercase wire form, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Processing => "processing",
            Status::Completed => "completed",
            Status::Failed => "failed",
        }
    }
}

/// Requested quality tier for video downloads
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Quality {
    /// Best available video+audio (default)
    #[default]
    #[serde(rename = "best")]
    Best,
    /// Worst available (smallest file)
    #[serde(rename = "worst")]
    Worst,
    /// Capped at 480p
    #[serde(rename = "480p")]
    P480,
    /// Capped at 720p
    #[serde(rename = "720p")]
    P720,
    /// Capped at 1080p
    #[serde(rename = "1080p")]
    P1080,
}

/// Source platform, detected from the request URL host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// youtube.com / youtu.be
    Youtube,
    /// tiktok.com
    Tiktok,
    /// instagram.com
    Instagram,
    /// facebook.com
    Facebook,
    /// twitter.com / x.com
    Twitter,
    /// Anything else
    #[default]
    Unknown,
}

impl Platform {
    /// Detect the platform from a URL string.
    ///
    /// Matching is by host suffix, so `www.youtube.com` and `m.youtube.com`
    /// both resolve to [`Platform::Youtube`]. An unparseable URL resolves to
    /// [`Platform::Unknown`].
    pub fn from_url(url: &str) -> Self {
        let Ok(parsed) = url::Url::parse(url) else {
            return Platform::Unknown;
        };
        let Some(host) = parsed.host_str() else {
            return Platform::Unknown;
        };
        let host = host.to_ascii_lowercase();

        let matches_domain = |domain: &str| host == domain || host.ends_with(&format!(".{domain}"));

        if matches_domain("tiktok.com") {
            Platform::Tiktok
        } else if matches_domain("instagram.com") {
            Platform::Instagram
        } else if matches_domain("youtube.com") || matches_domain("youtu.be") {
            Platform::Youtube
        } else if matches_domain("facebook.com") {
            Platform::Facebook
        } else if matches_domain("twitter.com") || matches_domain("x.com") {
            Platform::Twitter
        } else {
            Platform::Unknown
        }
    }

    /// Lowercase wire form, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Twitter => "twitter",
            Platform::Unknown => "unknown",
        }
    }
}

/// Options for submitting a download job
///
/// Immutable snapshot of the request; defaults mirror the public API
/// defaults (mp4 container, best quality, watermark removal on).
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobOptions {
    /// Requested container format hint
    #[serde(default = "default_format")]
    pub format: String,

    /// Quality tier for video downloads
    #[serde(default)]
    pub quality: Quality,

    /// Download best available audio only
    #[serde(default)]
    pub audio_only: bool,

    /// Prefer watermark-free sources where the platform supports it
    #[serde(default = "default_true")]
    pub remove_watermark: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            format: default_format(),
            quality: Quality::default(),
            audio_only: false,
            remove_watermark: true,
        }
    }
}

fn default_format() -> String {
    "mp4".to_string()
}

fn default_true() -> bool {
    true
}

/// A progress sample reported by the extractor mid-download
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Human-readable percentage, e.g. "42.3%"
    pub progress: String,
    /// Human-readable transfer rate, e.g. "1.23MiB/s"
    pub speed: Option<String>,
    /// Human-readable time remaining, e.g. "00:35"
    pub eta: Option<String>,
    /// Bytes fetched so far, when derivable
    pub downloaded_bytes: Option<u64>,
    /// Expected total size in bytes, when derivable
    pub total_bytes: Option<u64>,
}

/// Descriptive metadata reported by the extractor's inspect pass
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct MediaMetadata {
    /// Media title
    pub title: Option<String>,

    /// Uploader / channel name
    pub uploader: Option<String>,

    /// Media duration in seconds
    pub duration_seconds: Option<f64>,

    /// View count at extraction time
    pub view_count: Option<u64>,

    /// Upload date as reported by the platform (YYYYMMDD)
    pub upload_date: Option<String>,

    /// Detected source platform
    pub platform: Platform,
}

/// Classified cause of a failed job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Reported or measured size exceeds the configured maximum
    SizeExceeded,
    /// Wall-clock budget for the extraction exceeded
    Timeout,
    /// The underlying extractor failed; message passed through
    ExtractionFailed,
    /// Extractor reported success but no output file was located
    ArtifactNotFound,
}

impl FailureKind {
    /// Snake-case wire form, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SizeExceeded => "size_exceeded",
            FailureKind::Timeout => "timeout",
            FailureKind::ExtractionFailed => "extraction_failed",
            FailureKind::ArtifactNotFound => "artifact_not_found",
        }
    }
}

/// Terminal error recorded on a failed job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobFailure {
    /// Classified error kind
    pub kind: FailureKind,

    /// Human-readable message
    pub message: String,
}

/// Result recorded on a completed job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    /// Artifact location on disk
    pub path: PathBuf,

    /// Artifact size in bytes (always within the configured maximum)
    pub size_bytes: u64,

    /// On-disk filename, `{job_id}.{ext}`
    pub stored_filename: String,

    /// Sanitized user-facing filename derived from the title
    pub download_filename: String,

    /// Metadata captured during the preflight inspect
    pub metadata: MediaMetadata,
}

/// State container for one download job
///
/// Owned by the orchestrator; callers only ever see clones. Exactly one of
/// `result`/`error` is set once the status is terminal, and neither before.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobRecord {
    /// Unique job identifier
    pub id: JobId,

    /// Requested media URL
    pub url: String,

    /// Immutable snapshot of the request options
    pub options: JobOptions,

    /// Current status
    pub status: Status,

    /// Human-readable status line
    pub message: String,

    /// When the job was accepted
    pub created_at: DateTime<Utc>,

    /// When extraction started (None while queued)
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,

    /// Latest extractor-reported percentage string
    pub progress: Option<String>,

    /// Latest extractor-reported transfer rate
    pub speed: Option<String>,

    /// Latest extractor-reported time remaining
    pub eta: Option<String>,

    /// Bytes fetched so far
    pub downloaded_bytes: Option<u64>,

    /// Expected total size in bytes
    pub total_bytes: Option<u64>,

    /// Present only when status is `completed`
    pub result: Option<JobResult>,

    /// Present only when status is `failed`
    pub error: Option<JobFailure>,
}

impl JobRecord {
    /// Create a fresh record in the `queued` state
    pub fn new(id: JobId, url: impl Into<String>, options: JobOptions) -> Self {
        Self {
            id,
            url: url.into(),
            options,
            status: Status::Queued,
            message: "Download queued".to_string(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            progress: None,
            speed: None,
            eta: None,
            downloaded_bytes: None,
            total_bytes: None,
            result: None,
            error: None,
        }
    }

    /// Wall-clock extraction time in seconds, once finished
    pub fn duration_seconds(&self) -> Option<f64> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        Some((finished - started).num_milliseconds() as f64 / 1000.0)
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and queued
    Queued {
        /// Job ID
        id: JobId,
    },

    /// Job admitted past the gate; extraction starting
    Started {
        /// Job ID
        id: JobId,
    },

    /// Progress sample applied to the job record
    Progress {
        /// Job ID
        id: JobId,
        /// Percentage string
        progress: String,
        /// Transfer rate string
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<String>,
        /// Time remaining string
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<String>,
    },

    /// Job completed; artifact available
    Completed {
        /// Job ID
        id: JobId,
        /// Artifact path
        path: PathBuf,
        /// Artifact size in bytes
        size_bytes: u64,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Classified error kind
        kind: FailureKind,
        /// Error message
        error: String,
    },

    /// Terminal record evicted by the retention sweeper
    Evicted {
        /// Job ID
        id: JobId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Static description of a supported platform for the capabilities listing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlatformInfo {
    /// Display name
    pub name: String,

    /// Primary domain
    pub domain: String,

    /// Feature tags
    pub features: Vec<String>,
}

/// Supported platforms and their feature tags.
///
/// Pure data; the orchestrator is not involved.
pub fn supported_platforms() -> Vec<PlatformInfo> {
    let entry = |name: &str, domain: &str, features: &[&str]| PlatformInfo {
        name: name.to_string(),
        domain: domain.to_string(),
        features: features.iter().map(|f| f.to_string()).collect(),
    };

    vec![
        entry(
            "YouTube",
            "youtube.com",
            &["High Quality", "Multiple Formats", "Subtitles"],
        ),
        entry("TikTok", "tiktok.com", &["Watermark Free", "HD Quality"]),
        entry("Instagram", "instagram.com", &["Stories", "Reels", "IGTV"]),
        entry(
            "Twitter/X",
            "twitter.com",
            &["Video Tweets", "High Quality"],
        ),
        entry("Facebook", "facebook.com", &["Video Posts", "Stories"]),
    ]
}
