use std::path::PathBuf;
use std::time::Duration;

use grabber_core::{Effect, Msg, RunResult, TrackRow};
use grabber_engine::{EngineEvent, EngineHandle, RunOutcome, SingleJob, TrackEntry};
use grabber_logging::{grab_info, grab_warn};

/// Executes core effects on the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
    quit: bool,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            quit: false,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Runs the effects. Returns follow-up messages for starts the engine refused.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Msg> {
        let mut follow_up = Vec::new();
        for effect in effects {
            let started = match effect {
                Effect::Scan { url, limit } => {
                    grab_info!("Scan url={} limit={:?}", url, limit);
                    self.engine.start_scan(url, limit)
                }
                Effect::DownloadSingle(job) => {
                    grab_info!("DownloadSingle url={} format={}", job.url, job.format_choice);
                    self.engine.start_single(SingleJob {
                        url: job.url,
                        output_dir: PathBuf::from(job.output_dir),
                        format_choice: job.format_choice,
                    })
                }
                Effect::DownloadPlaylist {
                    tracks,
                    output_dir,
                    format_choice,
                } => {
                    grab_info!("DownloadPlaylist tracks={} format={}", tracks.len(), format_choice);
                    self.engine.start_playlist(
                        tracks.into_iter().map(track_entry).collect(),
                        PathBuf::from(output_dir),
                        format_choice,
                    )
                }
                Effect::Stop => {
                    if !self.engine.stop() {
                        grab_info!("Stop with no active run");
                    }
                    Ok(())
                }
                Effect::Quit => {
                    self.quit = true;
                    Ok(())
                }
            };
            if let Err(err) = started {
                grab_warn!("engine refused to start: {}", err);
                follow_up.push(Msg::StartRejected(err.to_string()));
            }
        }
        follow_up
    }

    /// Drains pending engine events without blocking.
    pub fn poll(&mut self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            msgs.push(event_to_msg(event));
        }
        msgs
    }

    /// Waits up to `timeout` for the next engine event.
    pub fn wait(&mut self, timeout: Duration) -> Option<Msg> {
        self.engine.recv_timeout(timeout).map(event_to_msg)
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress {
            filename,
            bytes,
            total,
        } => Msg::TransferProgress {
            filename,
            bytes,
            total,
        },
        EngineEvent::LogLine(line) => Msg::LogLine(line),
        EngineEvent::Finished { path } => Msg::FileSaved(path.display().to_string()),
        EngineEvent::TrackStarted {
            position,
            total,
            title,
        } => Msg::TrackStarted {
            position,
            total,
            title,
        },
        EngineEvent::Overall { percent } => Msg::OverallProgress(percent),
        EngineEvent::ScanCompleted(Ok(entries)) => {
            Msg::ScanFinished(Ok(entries.into_iter().map(track_row).collect()))
        }
        EngineEvent::ScanCompleted(Err(err)) => Msg::ScanFinished(Err(err.message)),
        EngineEvent::RunCompleted(outcome) => Msg::RunFinished(match outcome {
            RunOutcome::Completed => RunResult::Completed,
            RunOutcome::Stopped => RunResult::Stopped,
            RunOutcome::Failed(reason) => RunResult::Failed(reason),
        }),
    }
}

fn track_row(entry: TrackEntry) -> TrackRow {
    TrackRow {
        index: entry.index,
        title: entry.title,
        source_url: entry.source_url,
        id: entry.id,
        included: true,
        renamed: false,
    }
}

fn track_entry(row: TrackRow) -> TrackEntry {
    TrackEntry {
        index: row.index,
        title: row.title,
        source_url: row.source_url,
        id: row.id,
        renamed: row.renamed,
    }
}
