//! CLI-based extractor using the external yt-dlp binary
//!
//! The subprocess boundary keeps the blocking, CPU/IO-heavy extraction work
//! out of the async runtime entirely: the orchestrator awaits the child
//! process while status queries keep flowing.

use super::{ExtractRequest, Extractor, Inspection};
use crate::config::ExtractorConfig;
use crate::error::{Error, Result};
use crate::types::{MediaMetadata, Platform, ProgressUpdate};
use async_trait::async_trait;
use regex::Regex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Number of trailing stderr lines kept for error reporting
const STDERR_TAIL_LINES: usize = 20;

/// Progress line emitted by `yt-dlp --newline`, e.g.
/// `[download]  42.3% of ~10.55MiB at 1.23MiB/s ETA 00:05`
const PROGRESS_PATTERN: &str = r"^\[download\]\s+(?P<percent>\d+(?:\.\d+)?)%\s+of\s+~?\s*(?P<total>\S+)(?:\s+at\s+(?P<speed>\S+))?(?:\s+ETA\s+(?P<eta>\S+))?";

fn progress_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PROGRESS_PATTERN).ok()).as_ref()
}

/// Extractor backed by the external `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use media_dl::extractor::YtDlpExtractor;
///
/// // Auto-discover from PATH
/// let extractor = YtDlpExtractor::from_path();
///
/// // Or create with an explicit path
/// let extractor = YtDlpExtractor::new("/usr/local/bin/yt-dlp".into());
/// ```
pub struct YtDlpExtractor {
    binary_path: PathBuf,
}

impl YtDlpExtractor {
    /// Create a new extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Uses the `which` crate to search the system PATH.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Resolve an extractor from configuration.
    ///
    /// An explicit `ytdlp_path` wins; otherwise PATH is searched when
    /// `search_path` is enabled. Fails with
    /// [`Error::ExtractorUnavailable`] when neither yields a binary.
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        if let Some(path) = &config.ytdlp_path {
            return Ok(Self::new(path.clone()));
        }
        if config.search_path
            && let Some(extractor) = Self::from_path()
        {
            return Ok(extractor);
        }
        Err(Error::ExtractorUnavailable(
            "yt-dlp not configured and not found in PATH".to_string(),
        ))
    }

    fn base_command(&self, request: &ExtractRequest) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--socket-timeout")
            .arg(request.socket_timeout.as_secs().to_string())
            .arg("--retries")
            .arg(request.retries.to_string());
        cmd
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn inspect(&self, request: &ExtractRequest) -> Result<Inspection> {
        let output = self
            .base_command(request)
            .arg("-J")
            .arg("--skip-download")
            .arg("--")
            .arg(&request.url)
            .output()
            .await
            .map_err(|e| {
                Error::Extraction(format!(
                    "failed to execute {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("no error output");
            return Err(Error::Extraction(format!(
                "yt-dlp inspect exited with {}: {detail}",
                output.status
            )));
        }

        let info: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        Ok(parse_inspection(&info, &request.url))
    }

    async fn download(
        &self,
        request: &ExtractRequest,
        progress: mpsc::Sender<ProgressUpdate>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let template = format!("{}.%(ext)s", request.output_stem.display());

        let mut child = self
            .base_command(request)
            .arg("--newline")
            .arg("-f")
            .arg(&request.format)
            .arg("-o")
            .arg(&template)
            .arg("--")
            .arg(&request.url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // If this future is dropped (timeout), the child must not
            // keep writing into the download directory
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Extraction(format!(
                    "failed to spawn {}: {e}",
                    self.binary_path.display()
                ))
            })?;

        let progress_task = child.stdout.take().map(|stdout| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(update) = parse_progress_line(&line) {
                        // try_send: a slow consumer drops samples, it never
                        // stalls the pipe
                        let _ = progress.try_send(update);
                    }
                }
            })
        });

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail
            })
        });

        let status = tokio::select! {
            status = child.wait() => status.map_err(|e| {
                Error::Extraction(format!("failed to wait for yt-dlp: {e}"))
            })?,
            _ = cancel.cancelled() => {
                tracing::debug!(url = %request.url, "Killing yt-dlp after cancellation");
                child.kill().await.ok();
                return Err(Error::Extraction("extraction cancelled".to_string()));
            }
        };

        if let Some(task) = progress_task {
            task.await.ok();
        }
        let stderr_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => VecDeque::new(),
        };

        if !status.success() {
            let detail = stderr_tail
                .iter()
                .rev()
                .find(|line| line.contains("ERROR"))
                .or_else(|| stderr_tail.back())
                .cloned()
                .unwrap_or_else(|| "no error output".to_string());
            return Err(Error::Extraction(format!(
                "yt-dlp exited with {status}: {detail}"
            )));
        }

        Ok(())
    }
}

/// Parse one `--newline` progress line into a [`ProgressUpdate`].
///
/// Returns `None` for non-progress output (merge messages, info lines).
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let caps = progress_regex()?.captures(line.trim())?;

    let percent_str = caps.name("percent")?.as_str();
    let percent: f64 = percent_str.parse().ok()?;

    let total = caps.name("total").map(|m| m.as_str().to_string());
    let speed = caps.name("speed").map(|m| m.as_str().to_string());
    let eta = caps
        .name("eta")
        .map(|m| m.as_str().to_string())
        .filter(|eta| eta != "Unknown");

    let total_bytes = total.as_deref().and_then(parse_size);
    let downloaded_bytes = total_bytes.map(|total| ((percent / 100.0) * total as f64) as u64);

    Some(ProgressUpdate {
        progress: format!("{percent_str}%"),
        speed,
        eta,
        downloaded_bytes,
        total_bytes,
    })
}

/// Parse a human-readable size like "10.55MiB" into bytes.
pub(crate) fn parse_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let unit_start = s.find(|c: char| c.is_ascii_alphabetic())?;
    let (number, unit) = s.split_at(unit_start);
    let value: f64 = number.parse().ok()?;

    let multiplier: f64 = match unit {
        "B" => 1.0,
        "KiB" => 1024.0,
        "MiB" => 1024.0 * 1024.0,
        "GiB" => 1024.0 * 1024.0 * 1024.0,
        "TiB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        "KB" => 1e3,
        "MB" => 1e6,
        "GB" => 1e9,
        "TB" => 1e12,
        _ => return None,
    };

    Some((value * multiplier) as u64)
}

/// Build an [`Inspection`] from the `-J` info JSON.
pub(crate) fn parse_inspection(info: &serde_json::Value, url: &str) -> Inspection {
    let metadata = MediaMetadata {
        title: info["title"].as_str().map(|s| s.to_string()),
        uploader: info["uploader"].as_str().map(|s| s.to_string()),
        duration_seconds: info["duration"].as_f64(),
        view_count: info["view_count"].as_u64(),
        upload_date: info["upload_date"].as_str().map(|s| s.to_string()),
        platform: Platform::from_url(url),
    };

    // Exact size when the platform reports one, estimate otherwise
    let filesize = info["filesize"]
        .as_u64()
        .or_else(|| info["filesize_approx"].as_u64());

    Inspection { metadata, filesize }
}
