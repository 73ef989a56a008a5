use grabber_logging::grab_debug;

use crate::{AppState, Effect, Msg, Phase, RunResult, TrackSelection};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UrlChanged(url) => {
            state.form_mut().url = url;
            Vec::new()
        }
        Msg::OutputDirChanged(dir) => {
            state.form_mut().output_dir = dir;
            Vec::new()
        }
        Msg::FormatChanged(format) => {
            state.form_mut().format = format;
            Vec::new()
        }
        Msg::QualityChanged(quality) => {
            state.form_mut().quality = quality;
            Vec::new()
        }
        Msg::PlaylistToggled(on) => {
            state.form_mut().playlist_mode = on;
            Vec::new()
        }
        Msg::ScanLimitChanged(limit) => {
            state.form_mut().scan_limit = limit;
            Vec::new()
        }
        Msg::StartClicked => start(&mut state),
        Msg::StopClicked => stop(&mut state),
        Msg::ClearLogClicked => {
            state.clear_log();
            Vec::new()
        }
        Msg::QuitClicked => {
            state.request_quit();
            if state.phase().is_active() {
                state.request_stop();
                vec![Effect::Stop, Effect::Quit]
            } else {
                vec![Effect::Quit]
            }
        }
        Msg::TrackToggled { index } => {
            if let Some(selection) = state.selection_mut() {
                if selection.toggle(index) {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::TrackRenamed { index, title } => {
            if let Some(selection) = state.selection_mut() {
                if selection.rename(index, &title) {
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::SelectAllClicked => {
            if let Some(selection) = state.selection_mut() {
                selection.select_all();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DeselectAllClicked => {
            if let Some(selection) = state.selection_mut() {
                selection.deselect_all();
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SelectionConfirmed => confirm_selection(&mut state),
        Msg::SelectionCancelled => {
            if state.phase() == Phase::Selecting {
                cancel_selection(&mut state);
            }
            Vec::new()
        }
        Msg::ScanFinished(result) => {
            scan_finished(&mut state, result);
            Vec::new()
        }
        Msg::TrackStarted {
            position,
            total,
            title,
        } => {
            if matches!(state.phase(), Phase::Downloading { .. }) {
                state.set_phase(Phase::Downloading { position, total });
                let line = format!("[{position}/{total}] {title}");
                state.set_status(line.clone());
                state.push_log(line);
            }
            Vec::new()
        }
        Msg::TransferProgress {
            filename,
            bytes,
            total,
        } => {
            let line = match total.filter(|t| *t > 0) {
                Some(total) => {
                    let pct = bytes as f64 * 100.0 / total as f64;
                    if state.phase() == Phase::Running {
                        state.set_percent(pct.clamp(0.0, 100.0) as u8);
                    }
                    format!("Downloading: {filename} {pct:.1}%")
                }
                None => format!("Downloading: {filename} (size unknown)"),
            };
            state.set_progress_line(Some(line));
            Vec::new()
        }
        Msg::LogLine(line) => {
            state.push_log(line);
            Vec::new()
        }
        Msg::FileSaved(path) => {
            state.set_last_saved(path);
            Vec::new()
        }
        Msg::OverallProgress(percent) => {
            state.set_percent(percent);
            Vec::new()
        }
        Msg::RunFinished(result) => {
            run_finished(&mut state, result);
            Vec::new()
        }
        Msg::StartRejected(reason) => {
            state.push_log(format!("Error: {reason}"));
            state.set_status(format!("Could not start: {reason}"));
            state.finish_run(None);
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start(state: &mut AppState) -> Vec<Effect> {
    if state.phase() != Phase::Idle {
        grab_debug!("start ignored in phase {:?}", state.phase());
        return Vec::new();
    }
    let job = match state.job_from_form() {
        Ok(job) => job,
        Err(status) => {
            if status.starts_with("Invalid URL") {
                state.push_log(status.clone());
            }
            state.set_status(status);
            return Vec::new();
        }
    };

    if job.playlist_mode {
        state.push_log(format!("Scanning: {}", job.url));
        state.set_status("Scanning playlist…");
        let effect = Effect::Scan {
            url: job.url.clone(),
            limit: job.scan_limit,
        };
        state.begin_run(Phase::Scanning, job);
        vec![effect]
    } else {
        state.push_log(format!("Starting: {}", job.url));
        state.set_status("Downloading…");
        state.begin_run(Phase::Running, job.clone());
        vec![Effect::DownloadSingle(job)]
    }
}

fn stop(state: &mut AppState) -> Vec<Effect> {
    match state.phase() {
        Phase::Selecting => {
            cancel_selection(state);
            Vec::new()
        }
        phase if phase.is_active() && !state.stop_requested() => {
            state.request_stop();
            state.push_log("⏹ Stop requested…");
            state.set_status("Stopping…");
            vec![Effect::Stop]
        }
        _ => Vec::new(),
    }
}

fn cancel_selection(state: &mut AppState) {
    state.take_selection();
    state.push_log("Cancelled.");
    state.set_status("Cancelled.");
    state.finish_run(Some(RunResult::Stopped));
}

fn confirm_selection(state: &mut AppState) -> Vec<Effect> {
    if state.phase() != Phase::Selecting {
        return Vec::new();
    }
    let tracks = state
        .take_selection()
        .map(|selection| selection.confirm())
        .unwrap_or_default();
    let Some(job) = state.job().cloned() else {
        state.finish_run(None);
        return Vec::new();
    };
    if tracks.is_empty() {
        state.push_log("Cancelled.");
        state.set_status("Cancelled.");
        state.finish_run(Some(RunResult::Stopped));
        return Vec::new();
    }

    state.push_log(format!("Downloading {} track(s)…", tracks.len()));
    state.set_phase(Phase::Downloading {
        position: 0,
        total: tracks.len(),
    });
    vec![Effect::DownloadPlaylist {
        tracks,
        output_dir: job.output_dir,
        format_choice: job.format_choice,
    }]
}

fn scan_finished(state: &mut AppState, result: Result<Vec<crate::TrackRow>, String>) {
    if state.phase() != Phase::Scanning {
        grab_debug!("late scan result ignored");
        return;
    }
    if state.stop_requested() {
        state.push_log("Stopped.");
        state.set_status("Stopped.");
        state.finish_run(Some(RunResult::Stopped));
        return;
    }
    match result {
        Ok(rows) if rows.is_empty() => {
            state.push_log("No tracks found.");
            state.set_status("No tracks found.");
            state.finish_run(Some(RunResult::Completed));
        }
        Ok(rows) => {
            state.set_status(format!("Found {} tracks.", rows.len()));
            state.open_selection(TrackSelection::new(rows));
        }
        Err(message) => {
            state.push_log(format!("Scan error: {message}"));
            state.set_status("Scan failed.");
            state.finish_run(Some(RunResult::Failed(message)));
        }
    }
}

fn run_finished(state: &mut AppState, result: RunResult) {
    if !matches!(state.phase(), Phase::Running | Phase::Downloading { .. }) {
        grab_debug!("run result {:?} ignored in phase {:?}", result, state.phase());
        return;
    }
    match &result {
        RunResult::Completed => {
            state.set_percent(100);
            state.set_status("All done ✔");
            state.push_log("Download complete!");
        }
        RunResult::Stopped => {
            state.set_status("Stopped.");
            state.push_log("Stopped.");
        }
        RunResult::Failed(_) => {
            state.set_status("Failed.");
        }
    }
    state.finish_run(Some(result));
}
