use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use grabber_logging::{grab_info, grab_warn};
use tokio_util::sync::CancellationToken;

use crate::fetch::ProgressSink;
use crate::filename::sanitize_file_stem;
use crate::format::FormatSelection;
use crate::persist::ensure_output_dir;
use crate::service::{
    FlatInfo, FlatRecord, HookAbort, HookEvent, MediaService, ProgressHook, ServiceError,
    ServiceRequest,
};
use crate::{EngineEvent, TrackEntry};

/// A playlist scan could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub message: String,
}

impl From<ServiceError> for ExtractionError {
    fn from(err: ServiceError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
    /// The cancellation token was observed. Not a failure.
    #[error("stopped by user")]
    Stopped,
    #[error("{0}")]
    Failed(String),
}

/// Everything needed to download one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Format label or raw format expression chosen by the user.
    pub format_choice: String,
    /// Replaces the service-provided title in the output file name.
    pub title_override: Option<String>,
}

/// The operations every front-end relies on.
#[async_trait::async_trait]
pub trait MediaAdapter: Send + Sync {
    async fn scan_playlist(
        &self,
        url: &str,
        limit: Option<NonZeroU32>,
    ) -> Result<Vec<TrackEntry>, ExtractionError>;

    async fn download_one(
        &self,
        request: &TrackRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

/// Adapts a [`MediaService`] to the [`MediaAdapter`] interface.
pub struct ServiceAdapter<S> {
    service: S,
    ffmpeg_location: Option<PathBuf>,
}

impl<S: MediaService> ServiceAdapter<S> {
    pub fn new(service: S, ffmpeg_location: Option<PathBuf>) -> Self {
        Self {
            service,
            ffmpeg_location,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn build_request(&self, request: &TrackRequest) -> ServiceRequest {
        let selection = FormatSelection::from_choice(&request.format_choice);
        ServiceRequest {
            url: request.url.clone(),
            format: selection.expression,
            output_template: output_template(&request.output_dir, request.title_override.as_deref()),
            no_playlist: true,
            ffmpeg_location: self.ffmpeg_location.clone(),
            post_process: selection.post_process,
        }
    }
}

#[async_trait::async_trait]
impl<S: MediaService> MediaAdapter for ServiceAdapter<S> {
    async fn scan_playlist(
        &self,
        url: &str,
        limit: Option<NonZeroU32>,
    ) -> Result<Vec<TrackEntry>, ExtractionError> {
        let info = self
            .service
            .extract_flat(url, limit.map(NonZeroU32::get))
            .await?;
        let mut entries = entries_from_flat(url, info);
        if let Some(limit) = limit {
            entries.truncate(limit.get() as usize);
        }
        grab_info!("scan of {} found {} entries", url, entries.len());
        Ok(entries)
    }

    async fn download_one(
        &self,
        request: &TrackRequest,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        ensure_output_dir(&request.output_dir)
            .map_err(|err| DownloadError::Failed(err.to_string()))?;

        let mut service_request = self.build_request(request);
        let hook = HookBridge { sink, cancel };

        let first = self.service.download(&service_request, &hook, cancel).await;
        let err = match first {
            Ok(()) => {
                sink.emit(EngineEvent::LogLine("Download completed successfully.".to_string()));
                return Ok(());
            }
            Err(_) if cancel.is_cancelled() => return Err(DownloadError::Stopped),
            Err(err) => err,
        };

        if service_request.post_process.is_none() || !err.is_conversion_failure() {
            return Err(DownloadError::Failed(err.to_string()));
        }

        grab_warn!("conversion failed for {}: {}", request.url, err);
        sink.emit(EngineEvent::LogLine(format!("Error: {err}")));
        sink.emit(EngineEvent::LogLine(
            "Conversion failed. Trying to download without conversion.".to_string(),
        ));
        service_request.post_process = None;

        match self.service.download(&service_request, &hook, cancel).await {
            Ok(()) => {
                sink.emit(EngineEvent::LogLine(
                    "Download completed without conversion.".to_string(),
                ));
                Ok(())
            }
            Err(_) if cancel.is_cancelled() => Err(DownloadError::Stopped),
            Err(err) => Err(DownloadError::Failed(err.to_string())),
        }
    }
}

/// Bridges service hook events into engine events and checks for a stop request.
struct HookBridge<'a> {
    sink: &'a dyn ProgressSink,
    cancel: &'a CancellationToken,
}

impl ProgressHook for HookBridge<'_> {
    fn on_event(&self, event: HookEvent) -> Result<(), HookAbort> {
        match event {
            HookEvent::Downloading {
                filename,
                downloaded,
                total,
            } => {
                if self.cancel.is_cancelled() {
                    return Err(HookAbort);
                }
                self.sink.emit(EngineEvent::Progress {
                    filename: display_name(&filename),
                    bytes: downloaded,
                    total,
                });
            }
            HookEvent::Finished { filename } => {
                self.sink.emit(EngineEvent::LogLine(format!(
                    "Finished downloading: {}",
                    display_name(&filename)
                )));
            }
            HookEvent::Saved { path } => {
                self.sink.emit(EngineEvent::Finished { path });
            }
        }
        Ok(())
    }
}

fn output_template(output_dir: &Path, title_override: Option<&str>) -> String {
    let stem = match title_override {
        Some(title) => sanitize_file_stem(title),
        None => "%(title)s".to_string(),
    };
    output_dir
        .join(format!("{stem}.%(ext)s"))
        .to_string_lossy()
        .into_owned()
}

fn display_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string())
}

fn entries_from_flat(scanned_url: &str, info: FlatInfo) -> Vec<TrackEntry> {
    match info {
        FlatInfo::Single(record) => {
            vec![entry_from_record(1, record, Some(scanned_url))]
        }
        FlatInfo::Collection(items) => items
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, record)| entry_from_record(i + 1, record, None))
            .collect(),
    }
}

fn entry_from_record(index: usize, record: FlatRecord, scanned_url: Option<&str>) -> TrackEntry {
    let id = record.id.unwrap_or_default();
    let title = record
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| id.clone());
    let url = record.url.filter(|u| !u.is_empty());
    let webpage_url = record.webpage_url.filter(|u| !u.is_empty());
    // A fully extracted single item reports its media stream as `url`.
    let source_url = match scanned_url {
        Some(scanned) => webpage_url
            .or_else(|| Some(scanned.to_string()).filter(|u| !u.is_empty()))
            .or(url),
        None => url.or(webpage_url),
    }
    .unwrap_or_default();
    TrackEntry {
        index,
        title,
        source_url,
        id,
        renamed: false,
    }
}
