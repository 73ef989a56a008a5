//! Run drivers executed on the engine worker.
//!
//! Each function consumes one [`RunContext`] and reports a single
//! [`RunOutcome`]. Cancellation is cooperative: the context's token is checked
//! before every track, inside the progress hook and between fetched chunks.

use std::path::Path;

use grabber_logging::{grab_info, grab_warn};
use tokio_util::sync::CancellationToken;

use crate::adapter::{DownloadError, MediaAdapter, TrackRequest};
use crate::fetch::{Fetcher, ProgressSink};
use crate::filename::safe_filename_from_url;
use crate::{EngineEvent, FailureKind, RunOutcome, TrackEntry};

/// State shared between the display thread and one run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a cooperative stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

pub async fn run_single(
    adapter: &dyn MediaAdapter,
    request: &TrackRequest,
    ctx: &RunContext,
    sink: &dyn ProgressSink,
) -> RunOutcome {
    grab_info!("single download of {}", request.url);
    match adapter.download_one(request, sink, ctx.token()).await {
        Ok(()) => {
            sink.emit(EngineEvent::Overall { percent: 100 });
            if ctx.is_cancelled() {
                RunOutcome::Stopped
            } else {
                RunOutcome::Completed
            }
        }
        Err(DownloadError::Stopped) => RunOutcome::Stopped,
        Err(DownloadError::Failed(message)) => {
            grab_warn!("download of {} failed: {}", request.url, message);
            sink.emit(EngineEvent::LogLine(format!("Error: {message}")));
            RunOutcome::Failed(message)
        }
    }
}

/// Downloads a direct media link into `output_dir`, bypassing the extraction service.
pub async fn run_direct(
    fetcher: &dyn Fetcher,
    url: &str,
    output_dir: &Path,
    ctx: &RunContext,
    sink: &dyn ProgressSink,
) -> RunOutcome {
    let destination = output_dir.join(safe_filename_from_url(url));
    grab_info!("direct fetch of {} into {:?}", url, destination);
    match fetcher.fetch(url, &destination, sink, ctx.token()).await {
        Ok(output) => {
            if output.final_url != url {
                grab_info!("{} redirected to {}", url, output.final_url);
            }
            sink.emit(EngineEvent::LogLine(format!(
                "Saved {} ({} bytes).",
                output.path.display(),
                output.bytes_written
            )));
            sink.emit(EngineEvent::Finished { path: output.path });
            sink.emit(EngineEvent::Overall { percent: 100 });
            RunOutcome::Completed
        }
        Err(err) if err.kind == FailureKind::Cancelled => RunOutcome::Stopped,
        Err(err) => {
            grab_warn!("direct fetch of {} failed: {}", url, err);
            sink.emit(EngineEvent::LogLine(format!("Error: {err}")));
            RunOutcome::Failed(err.to_string())
        }
    }
}

/// Downloads the selected playlist entries one after another.
///
/// A failing entry is logged and skipped; only a stop request ends the run early.
pub async fn run_playlist(
    adapter: &dyn MediaAdapter,
    tracks: &[TrackEntry],
    output_dir: &Path,
    format_choice: &str,
    ctx: &RunContext,
    sink: &dyn ProgressSink,
) -> RunOutcome {
    let total = tracks.len();
    let mut failed = 0usize;
    grab_info!("playlist download of {} tracks", total);

    for (i, track) in tracks.iter().enumerate() {
        let position = i + 1;
        if ctx.is_cancelled() {
            sink.emit(EngineEvent::LogLine("Stopped by user.".to_string()));
            return RunOutcome::Stopped;
        }

        sink.emit(EngineEvent::TrackStarted {
            position,
            total,
            title: track.title.clone(),
        });

        let request = TrackRequest {
            url: track.source_url.clone(),
            output_dir: output_dir.to_path_buf(),
            format_choice: format_choice.to_string(),
            title_override: track.title_override().map(str::to_owned),
        };
        match adapter.download_one(&request, sink, ctx.token()).await {
            Ok(()) => {}
            Err(DownloadError::Stopped) => {
                sink.emit(EngineEvent::LogLine("Stopped by user.".to_string()));
                return RunOutcome::Stopped;
            }
            Err(DownloadError::Failed(message)) => {
                failed += 1;
                grab_warn!("track {} ({}) failed: {}", position, track.title, message);
                sink.emit(EngineEvent::LogLine(format!(
                    "  Error on '{}': {}",
                    track.title, message
                )));
            }
        }

        sink.emit(EngineEvent::Overall {
            percent: percent_of(position, total),
        });
    }

    if failed > 0 {
        sink.emit(EngineEvent::LogLine(format!(
            "{failed} of {total} track(s) failed."
        )));
    }

    if ctx.is_cancelled() {
        RunOutcome::Stopped
    } else {
        RunOutcome::Completed
    }
}

fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}
