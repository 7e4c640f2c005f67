//! Artifact resolution
//!
//! Locating the downloaded file after a successful extraction, and deriving
//! the user-facing filename from metadata. The extractor writes to
//! `{job_id}.{ext}` with the extension chosen by the media container, so the
//! resolver probes a fixed, ordered extension list rather than trusting the
//! extractor to report the final path.

use crate::types::{JobId, MediaMetadata};
use std::path::{Path, PathBuf};

/// Video extensions probed first, in order
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "webm", "mkv", "avi", "mov", "flv"];

/// Audio extensions probed after the video list, in order
pub const AUDIO_EXTENSIONS: [&str; 5] = ["mp3", "m4a", "wav", "ogg", "aac"];

/// Fallback title when metadata has none
const FALLBACK_TITLE: &str = "video";

/// Maximum length of the title portion of a derived filename
const MAX_TITLE_LEN: usize = 150;

/// A located artifact on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedArtifact {
    /// Full path of the file
    pub path: PathBuf,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Probe the download directory for the artifact of the given job.
///
/// Tries `{job_id}.{ext}` over [`VIDEO_EXTENSIONS`] first, then
/// [`AUDIO_EXTENSIONS`]; the first existing file wins. Returns `None` if no
/// candidate exists — callers classify that as a fatal job failure, never a
/// retry.
pub async fn locate(id: JobId, download_dir: &Path) -> Option<LocatedArtifact> {
    let stem = download_dir.join(id.to_string());

    for ext in VIDEO_EXTENSIONS.iter().chain(AUDIO_EXTENSIONS.iter()) {
        let candidate = stem.with_extension(ext);
        if let Ok(meta) = tokio::fs::metadata(&candidate).await
            && meta.is_file()
        {
            return Some(LocatedArtifact {
                path: candidate,
                size_bytes: meta.len(),
            });
        }
    }

    None
}

/// Derive the user-facing filename for an artifact.
///
/// Combines the extracted title (or a fallback literal when absent or
/// sanitized to nothing) with the artifact's actual extension. The title is
/// sanitized for path-unsafe characters so the result is safe to hand to a
/// `Content-Disposition` header or write to any filesystem.
pub fn derive_filename(metadata: &MediaMetadata, path: &Path) -> String {
    let title = metadata
        .title
        .as_deref()
        .map(sanitize_title)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_TITLE.to_string());

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{title}.{ext}"),
        None => title,
    }
}

/// Sanitize a title for use as a filename component.
///
/// Path separators, shell-hostile punctuation, and control characters become
/// underscores; leading/trailing dots and whitespace are trimmed so the
/// result can never be a dotfile or traverse directories. The output is
/// capped at [`MAX_TITLE_LEN`] characters.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    replaced
        .trim_matches(|c: char| c.is_whitespace() || c == '.')
        .chars()
        .take(MAX_TITLE_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}
