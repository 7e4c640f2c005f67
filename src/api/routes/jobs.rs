//! Download job handlers.

use super::{StatusResponse, SubmitRequest, SubmitResponse};
use crate::api::AppState;
use crate::error::{ApiError, Error};
use crate::types::{JobId, Platform, Status};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tokio_util::io::ReaderStream;

/// Validate a submitted URL at the transport boundary.
///
/// The orchestrator itself accepts any URL; syntax and the supported-domain
/// allow-list are enforced here, before a job is ever created.
fn validate_url(url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err("URL must use http or https".to_string());
    }

    if Platform::from_url(url) == Platform::Unknown {
        return Err("URL must be from a supported platform".to_string());
    }

    Ok(())
}

/// POST /downloads - Submit a download job
#[utoipa::path(
    post,
    path = "/downloads",
    tag = "downloads",
    request_body = SubmitRequest,
    responses(
        (status = 202, description = "Job accepted and queued", body = SubmitResponse),
        (status = 422, description = "Invalid or unsupported URL"),
        (status = 503, description = "Shutting down, not accepting new jobs")
    )
)]
pub async fn submit_download(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    if let Err(message) = validate_url(&request.url) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new("unsupported_url", message)),
        )
            .into_response();
    }

    match state.downloader.submit(request.url, request.options).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                status: Status::Queued,
                message: "Download started successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e @ Error::ShuttingDown) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(ApiError::from(e))).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to submit download");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::from(e))).into_response()
        }
    }
}

/// GET /downloads - List all tracked jobs
#[utoipa::path(
    get,
    path = "/downloads",
    tag = "downloads",
    responses(
        (status = 200, description = "All tracked jobs, newest first", body = Vec<StatusResponse>)
    )
)]
pub async fn list_downloads(State(state): State<AppState>) -> impl IntoResponse {
    let responses: Vec<StatusResponse> = state
        .downloader
        .list_jobs()
        .await
        .iter()
        .map(StatusResponse::from_record)
        .collect();

    (StatusCode::OK, Json(responses))
}

/// GET /downloads/:id/status - Get job status
#[utoipa::path(
    get,
    path = "/downloads/{id}/status",
    tag = "downloads",
    params(
        ("id" = JobId, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = StatusResponse),
        (status = 404, description = "Job not found")
    )
)]
pub async fn download_status(State(state): State<AppState>, Path(id): Path<JobId>) -> Response {
    match state.downloader.status(id).await {
        Ok(record) => (StatusCode::OK, Json(StatusResponse::from_record(&record))).into_response(),
        Err(e @ Error::JobNotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(ApiError::from(e))).into_response()
        }
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to get job status");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::from(e))).into_response()
        }
    }
}

/// GET /downloads/:id/file - Fetch the completed artifact
#[utoipa::path(
    get,
    path = "/downloads/{id}/file",
    tag = "downloads",
    params(
        ("id" = JobId, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Artifact stream", content_type = "application/octet-stream"),
        (status = 404, description = "Job not found or file missing"),
        (status = 409, description = "Job not completed")
    )
)]
pub async fn download_file(State(state): State<AppState>, Path(id): Path<JobId>) -> Response {
    let record = match state.downloader.status(id).await {
        Ok(record) => record,
        Err(e @ Error::JobNotFound(_)) => {
            return (StatusCode::NOT_FOUND, Json(ApiError::from(e))).into_response();
        }
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to look up job for file fetch");
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::from(e))).into_response();
        }
    };

    if record.status != Status::Completed {
        let error = Error::NotCompleted {
            id,
            status: record.status.as_str().to_string(),
        };
        return (StatusCode::CONFLICT, Json(ApiError::from(error))).into_response();
    }

    let Some(result) = record.result else {
        // Completed without a result would violate the record invariant
        tracing::error!(job_id = %id, "Completed job has no result");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::internal("completed job has no result")),
        )
            .into_response();
    };

    let file = match tokio::fs::File::open(&result.path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(job_id = %id, path = %result.path.display(), error = %e, "Artifact missing on disk");
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::new("file_missing", "artifact no longer on disk")),
            )
                .into_response();
        }
    };

    // Quotes in the derived filename would break the header value
    let disposition = format!(
        "attachment; filename=\"{}\"",
        result.download_filename.replace('"', "_")
    );

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, result.size_bytes)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(ReaderStream::new(file)))
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to build file response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": {"code": "internal_error", "message": e.to_string()}})),
            )
                .into_response()
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_accepts_supported_platforms() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "https://youtu.be/abc",
            "https://www.tiktok.com/@user/video/1",
            "https://www.instagram.com/reel/abc/",
            "https://x.com/user/status/1",
            "http://facebook.com/watch/?v=1",
        ] {
            assert!(validate_url(url).is_ok(), "{url} should validate");
        }
    }

    #[test]
    fn validate_url_rejects_unsupported_domains() {
        let err = validate_url("https://example.com/video").unwrap_err();
        assert!(err.contains("supported platform"));
    }

    #[test]
    fn validate_url_rejects_bad_syntax() {
        let err = validate_url("not a url").unwrap_err();
        assert!(err.contains("invalid URL"));
    }

    #[test]
    fn validate_url_rejects_non_http_schemes() {
        let err = validate_url("ftp://youtube.com/watch").unwrap_err();
        assert!(err.contains("http or https"));
    }
}
