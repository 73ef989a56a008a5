use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use grabber_logging::{grab_error, grab_info};

use crate::adapter::{ExtractionError, MediaAdapter, ServiceAdapter, TrackRequest};
use crate::fetch::{direct_fetch_satisfies, ChannelProgressSink, FetchSettings, Fetcher, ReqwestFetcher};
use crate::pipeline::{run_direct, run_playlist, run_single, RunContext};
use crate::ytdlp::YtDlpService;
use crate::{EngineEvent, RunOutcome, TrackEntry};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Extraction service executable.
    pub ytdlp_path: PathBuf,
    /// Conversion tool location handed to the service.
    pub ffmpeg_location: Option<PathBuf>,
    pub fetch: FetchSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            fetch: FetchSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("a run is already active")]
    RunActive,
    #[error("engine worker is not running")]
    WorkerGone,
}

/// A single item download as requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleJob {
    pub url: String,
    pub output_dir: PathBuf,
    pub format_choice: String,
}

enum EngineCommand {
    Scan {
        url: String,
        limit: Option<NonZeroU32>,
    },
    Single(SingleJob),
    Playlist {
        tracks: Vec<TrackEntry>,
        output_dir: PathBuf,
        format_choice: String,
    },
}

impl EngineCommand {
    fn is_scan(&self) -> bool {
        matches!(self, EngineCommand::Scan { .. })
    }
}

/// Display-thread handle to the background worker.
///
/// At most one run is active. The busy state is cleared when the caller
/// receives the run's terminal event through [`EngineHandle::try_recv`] or
/// [`EngineHandle::recv_timeout`].
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<(EngineCommand, RunContext)>,
    event_rx: mpsc::Receiver<EngineEvent>,
    current: Option<RunContext>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let adapter = ServiceAdapter::new(
            YtDlpService::new(config.ytdlp_path),
            config.ffmpeg_location,
        );
        let fetcher = ReqwestFetcher::new(config.fetch);
        Self::with_backends(Arc::new(adapter), Arc::new(fetcher))
    }

    pub fn with_backends(adapter: Arc<dyn MediaAdapter>, fetcher: Arc<dyn Fetcher>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<(EngineCommand, RunContext)>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    grab_error!("engine runtime unavailable: {}", err);
                    reject_all(cmd_rx, event_tx, &err.to_string());
                    return;
                }
            };
            while let Ok((command, ctx)) = cmd_rx.recv() {
                let adapter = adapter.clone();
                let fetcher = fetcher.clone();
                let is_scan = command.is_scan();
                let run_tx = event_tx.clone();
                let guard_tx = event_tx.clone();
                runtime.spawn(async move {
                    let run = tokio::spawn(async move {
                        handle_command(adapter.as_ref(), fetcher.as_ref(), command, ctx, run_tx)
                            .await;
                    });
                    // A run that dies without reporting would leave the handle busy.
                    if let Err(err) = run.await {
                        grab_error!("run task ended abnormally: {}", err);
                        let reason = format!("internal error: {err}");
                        let _ = guard_tx.send(failure_event(is_scan, &reason));
                    }
                });
            }
        });

        Self {
            cmd_tx,
            event_rx,
            current: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn start_scan(&mut self, url: impl Into<String>, limit: Option<NonZeroU32>) -> Result<(), EngineError> {
        self.start(EngineCommand::Scan {
            url: url.into(),
            limit,
        })
    }

    pub fn start_single(&mut self, job: SingleJob) -> Result<(), EngineError> {
        self.start(EngineCommand::Single(job))
    }

    pub fn start_playlist(
        &mut self,
        tracks: Vec<TrackEntry>,
        output_dir: PathBuf,
        format_choice: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.start(EngineCommand::Playlist {
            tracks,
            output_dir,
            format_choice: format_choice.into(),
        })
    }

    /// Flips the active run's cancellation token. Returns false when idle.
    pub fn stop(&self) -> bool {
        match &self.current {
            Some(ctx) => {
                ctx.cancel();
                true
            }
            None => false,
        }
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        let event = self.event_rx.try_recv().ok()?;
        self.observe(&event);
        Some(event)
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<EngineEvent> {
        let event = self.event_rx.recv_timeout(timeout).ok()?;
        self.observe(&event);
        Some(event)
    }

    fn start(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        if self.current.is_some() {
            return Err(EngineError::RunActive);
        }
        let ctx = RunContext::new();
        self.cmd_tx
            .send((command, ctx.clone()))
            .map_err(|_| EngineError::WorkerGone)?;
        self.current = Some(ctx);
        Ok(())
    }

    fn observe(&mut self, event: &EngineEvent) {
        if event.is_terminal() {
            self.current = None;
        }
    }
}

async fn handle_command(
    adapter: &dyn MediaAdapter,
    fetcher: &dyn Fetcher,
    command: EngineCommand,
    ctx: RunContext,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    match command {
        EngineCommand::Scan { url, limit } => {
            grab_info!("scanning {}", url);
            let result = adapter.scan_playlist(&url, limit).await;
            let _ = event_tx.send(EngineEvent::ScanCompleted(result));
        }
        EngineCommand::Single(job) => {
            let outcome = if direct_fetch_satisfies(&job.url, &job.format_choice) {
                run_direct(fetcher, &job.url, &job.output_dir, &ctx, &sink).await
            } else {
                let request = TrackRequest {
                    url: job.url,
                    output_dir: job.output_dir,
                    format_choice: job.format_choice,
                    title_override: None,
                };
                run_single(adapter, &request, &ctx, &sink).await
            };
            let _ = event_tx.send(EngineEvent::RunCompleted(outcome));
        }
        EngineCommand::Playlist {
            tracks,
            output_dir,
            format_choice,
        } => {
            let outcome =
                run_playlist(adapter, &tracks, &output_dir, &format_choice, &ctx, &sink).await;
            let _ = event_tx.send(EngineEvent::RunCompleted(outcome));
        }
    }
}

fn reject_all(
    cmd_rx: mpsc::Receiver<(EngineCommand, RunContext)>,
    event_tx: mpsc::Sender<EngineEvent>,
    reason: &str,
) {
    while let Ok((command, _ctx)) = cmd_rx.recv() {
        let _ = event_tx.send(failure_event(command.is_scan(), reason));
    }
}

/// Terminal event for a run that could not report its own outcome.
fn failure_event(is_scan: bool, reason: &str) -> EngineEvent {
    if is_scan {
        EngineEvent::ScanCompleted(Err(ExtractionError {
            message: reason.to_string(),
        }))
    } else {
        EngineEvent::RunCompleted(RunOutcome::Failed(reason.to_string()))
    }
}
