use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use grabber_logging::grab_debug;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use crate::persist::ensure_output_dir;
use crate::{EngineEvent, FailureKind, FetchError, FetchOutput};

/// File extensions that are downloaded directly instead of through the extraction service.
pub const DIRECT_MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "aac", "flac", "wav", "ogg", "opus", "mp4", "webm", "mkv", "mov", "avi",
];

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub chunk_size: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(15),
            chunk_size: 16 * 1024,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError>;
}

/// True when the URL path names a media file that can be streamed as-is.
pub fn is_direct_media_url(url: &str) -> bool {
    media_extension(url).is_some()
}

/// True when saving the linked file unchanged already gives the requested format.
///
/// Any other choice needs the extraction service for selection or conversion.
pub fn direct_fetch_satisfies(url: &str, format_choice: &str) -> bool {
    let Some(ext) = media_extension(url) else {
        return false;
    };
    let choice = format_choice.trim().to_ascii_lowercase();
    matches!(choice.as_str(), "" | "default" | "best") || choice == ext
}

fn media_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => DIRECT_MEDIA_EXTENSIONS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(ext))
            .map(|known| (*known).to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .read_timeout(self.settings.read_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let client = self.build_client()?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let total = response.content_length();
        let final_url = response.url().to_string();
        let filename = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        ensure_output_dir(dir).map_err(|err| FetchError::new(FailureKind::Io, err.to_string()))?;

        // Temp file lives beside the destination; it is removed on drop.
        let mut tmp = NamedTempFile::new_in(dir)?;
        let chunk_size = self.settings.chunk_size.max(1);
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(FetchError::new(FailureKind::Cancelled, "stopped by user"));
            }
            let chunk = chunk.map_err(map_reqwest_error)?;
            if chunk.is_empty() {
                continue;
            }
            for piece in chunk.chunks(chunk_size) {
                tmp.write_all(piece)?;
                written += piece.len() as u64;
                sink.emit(EngineEvent::Progress {
                    filename: filename.clone(),
                    bytes: written,
                    total,
                });
            }
        }
        tmp.flush()?;
        tmp.persist(destination)
            .map_err(|err| FetchError::from(err.error))?;
        grab_debug!("fetched {} bytes from {} into {:?}", written, url, destination);

        Ok(FetchOutput {
            path: destination.to_path_buf(),
            final_url,
            bytes_written: written,
            total,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
