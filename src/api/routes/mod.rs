//! API route handlers and request/response types.

mod jobs;
mod system;

pub use jobs::{download_file, download_status, list_downloads, submit_download};
pub use system::{event_stream, health_check, list_platforms, openapi_spec, shutdown};

// Re-export the `__path_*` item structs generated by `#[utoipa::path]` so the
// `OpenApi` derive can resolve them via `crate::api::routes::<handler>`.
#[doc(hidden)]
pub use jobs::{
    __path_download_file, __path_download_status, __path_list_downloads, __path_submit_download,
};
#[doc(hidden)]
pub use system::{
    __path_event_stream, __path_health_check, __path_list_platforms, __path_openapi_spec,
    __path_shutdown,
};

use crate::types::{JobId, JobOptions, JobRecord, MediaMetadata, Status};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /downloads`
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct SubmitRequest {
    /// Media URL to download
    pub url: String,

    /// Download options (all optional, flattened into the body)
    #[serde(flatten)]
    pub options: JobOptions,
}

/// Response body for `POST /downloads`
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Identity of the accepted job
    pub job_id: JobId,

    /// Always `queued` at submission time
    pub status: Status,

    /// Human-readable confirmation
    pub message: String,
}

/// Response body for `GET /downloads/:id/status`
///
/// The completion fields (`file_url`, `file_size_bytes`, `duration_seconds`,
/// `metadata`) appear only once the job is completed.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    /// Job identity
    pub job_id: JobId,

    /// Current status
    pub status: Status,

    /// Human-readable status line
    pub message: String,

    /// Latest reported percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,

    /// Latest reported transfer rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,

    /// Latest reported time remaining
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,

    /// Relative URL of the artifact fetch endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,

    /// Artifact size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,

    /// Wall-clock extraction time in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Media metadata captured during extraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MediaMetadata>,
}

impl StatusResponse {
    /// Project a job record onto the wire shape.
    pub fn from_record(record: &JobRecord) -> Self {
        let mut response = Self {
            job_id: record.id,
            status: record.status,
            message: record.message.clone(),
            progress: record.progress.clone(),
            speed: record.speed.clone(),
            eta: record.eta.clone(),
            file_url: None,
            file_size_bytes: None,
            duration_seconds: None,
            metadata: None,
        };

        if record.status == Status::Completed
            && let Some(result) = &record.result
        {
            response.file_url = Some(format!("/downloads/{}/file", record.id));
            response.file_size_bytes = Some(result.size_bytes);
            response.duration_seconds = record.duration_seconds();
            response.metadata = Some(result.metadata.clone());
        }

        response
    }
}
