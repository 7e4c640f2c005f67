//! # media-dl
//!
//! Backend library for media download services: a concurrency-limited,
//! cancellable download job orchestrator over a pluggable extraction engine
//! (yt-dlp by default).
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Fire-and-forget submission** - `submit` returns a job id immediately;
//!   callers poll status or subscribe to events
//! - **Bounded** - Concurrency, wall-clock time, artifact size, and record
//!   retention all have explicit limits
//! - **Engine-agnostic** - The extractor is a trait; anything that can turn
//!   a URL into a file plugs in
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, JobOptions, MediaDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let id = downloader
//!         .submit("https://www.youtube.com/watch?v=abc", JobOptions::default())
//!         .await?;
//!     println!("Submitted job {id}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Artifact location and filename derivation
pub mod artifact;
/// Configuration types
pub mod config;
/// Core orchestrator implementation
pub mod downloader;
/// Error types
pub mod error;
/// Extraction capability boundary and the yt-dlp implementation
pub mod extractor;
/// In-memory job registry
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, Config, DownloadConfig, ExtractorConfig, RetentionConfig};
pub use downloader::MediaDownloader;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use extractor::{ExtractRequest, Extractor, Inspection, YtDlpExtractor};
pub use store::JobStore;
pub use types::{
    Event, FailureKind, JobFailure, JobId, JobOptions, JobRecord, JobResult, MediaMetadata,
    Platform, PlatformInfo, ProgressUpdate, Quality, Status,
};

/// Helper function to run the orchestrator with graceful signal handling.
///
/// Waits for a termination signal and then calls the orchestrator's
/// `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = MediaDownloader::new(Config::default()).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MediaDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration can fail in restricted environments (containers,
    // tests), so each handler has a fallback
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
