//! Seam to the external extraction/download service.
//!
//! The service owns everything site specific: resolving URLs, enumerating
//! playlists, picking formats and running post-processors. This crate only
//! describes what it wants and listens to the hook events it gets back.

use std::path::PathBuf;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Post-processing step executed by the service after the download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    ExtractAudio { codec: String, quality: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub url: String,
    /// Format-selection expression, e.g. `bestaudio/best`.
    pub format: String,
    /// Output path template, e.g. `/music/%(title)s.%(ext)s`.
    pub output_template: String,
    pub no_playlist: bool,
    /// Where the conversion tool lives, if not on `PATH`.
    pub ffmpeg_location: Option<PathBuf>,
    pub post_process: Option<PostProcess>,
}

/// Progress notifications delivered while a download runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Downloading {
        filename: String,
        downloaded: u64,
        total: Option<u64>,
    },
    /// The raw media file finished downloading (before post-processing).
    Finished { filename: String },
    /// The final file was moved into place.
    Saved { path: PathBuf },
}

/// Returned by a hook to make the service abandon the current download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookAbort;

pub trait ProgressHook: Send + Sync {
    fn on_event(&self, event: HookEvent) -> Result<(), HookAbort>;
}

/// Metadata record returned by a flat (no download) query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlatRecord {
    pub title: Option<String>,
    pub id: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatInfo {
    Single(FlatRecord),
    /// Playlist entries in enumeration order; unavailable items are `None`.
    Collection(Vec<Option<FlatRecord>>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to launch {program}: {message}")]
    Launch { program: String, message: String },
    #[error("download aborted")]
    Aborted,
    #[error("{0}")]
    Failed(String),
    #[error("unreadable service output: {0}")]
    Parse(String),
}

impl ServiceError {
    /// True when the failure came from the conversion tool rather than the transfer.
    pub fn is_conversion_failure(&self) -> bool {
        match self {
            ServiceError::Failed(message) => {
                let lowered = message.to_lowercase();
                ["ffmpeg", "ffprobe", "postprocessing"]
                    .iter()
                    .any(|marker| lowered.contains(marker))
            }
            _ => false,
        }
    }
}

#[async_trait::async_trait]
pub trait MediaService: Send + Sync {
    /// Enumerates a URL without downloading. `limit` caps how many playlist
    /// items the service looks at.
    async fn extract_flat(&self, url: &str, limit: Option<u32>) -> Result<FlatInfo, ServiceError>;

    async fn download(
        &self,
        request: &ServiceRequest,
        hook: &dyn ProgressHook,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError>;
}
