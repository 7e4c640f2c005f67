//! Media extraction boundary
//!
//! This module provides a trait-based architecture for the extraction
//! capability: given a URL and a format configuration, produce a media file
//! plus descriptive metadata, or fail. The orchestrator only ever sees the
//! [`Extractor`] trait, so the actual engine is pluggable — production uses
//! the external `yt-dlp` binary, tests inject a mock.
//!
//! ## Architecture
//!
//! - [`Extractor`]: the boundary trait with an `inspect` (preflight,
//!   metadata only) and a `download` (full fetch with progress) operation
//! - [`YtDlpExtractor`]: CLI-backed implementation spawning `yt-dlp`
//! - [`format`]: pure format-expression selection policy

pub mod cli;
pub mod format;

pub use cli::YtDlpExtractor;

use crate::error::Result;
use crate::types::{MediaMetadata, ProgressUpdate};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One extraction request, built by the orchestrator per job
#[derive(Clone, Debug)]
pub struct ExtractRequest {
    /// Media URL to extract from
    pub url: String,

    /// Format expression (see [`format::format_expression`])
    pub format: String,

    /// Output path without extension; the extractor appends the container's
    /// actual extension (`{stem}.{ext}`)
    pub output_stem: PathBuf,

    /// Socket timeout passed through to the extraction engine
    pub socket_timeout: Duration,

    /// Transient-error retry count passed through to the extraction engine
    pub retries: u32,
}

/// Result of a preflight inspect: metadata plus the reported size, if any
#[derive(Clone, Debug, Default)]
pub struct Inspection {
    /// Descriptive metadata for the media
    pub metadata: MediaMetadata,

    /// Expected file size in bytes, when the platform reports one
    pub filesize: Option<u64>,
}

/// The extraction capability boundary.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently; the orchestrator bounds concurrency itself.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short identifier for logging
    fn name(&self) -> &str;

    /// Preflight: fetch metadata and the expected size without downloading.
    async fn inspect(&self, request: &ExtractRequest) -> Result<Inspection>;

    /// Fetch the media into `{output_stem}.{ext}`.
    ///
    /// Progress samples are streamed through `progress` on a best-effort
    /// basis (a full channel drops samples rather than stalling the fetch).
    /// The fetch must abort promptly when `cancel` fires; after that the
    /// implementation must not touch the filesystem for this request again.
    async fn download(
        &self,
        request: &ExtractRequest,
        progress: mpsc::Sender<ProgressUpdate>,
        cancel: CancellationToken,
    ) -> Result<()>;
}
