use std::num::NonZeroU32;
use std::sync::Once;

use grabber_core::{
    update, AppState, Effect, FormState, JobConfig, Msg, Phase, RunResult, TrackRow,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(grabber_logging::initialize_for_tests);
}

fn ready_state(url: &str, playlist: bool) -> AppState {
    AppState::with_form(FormState {
        url: url.to_string(),
        output_dir: "/home/user/Media".to_string(),
        format: "mp3".to_string(),
        playlist_mode: playlist,
        ..FormState::default()
    })
}

fn run(state: AppState, msgs: Vec<Msg>) -> (AppState, Vec<Effect>) {
    msgs.into_iter().fold((state, Vec::new()), |(state, mut all), msg| {
        let (next, effects) = update(state, msg);
        all.extend(effects);
        (next, all)
    })
}

fn log_texts(state: &AppState) -> Vec<String> {
    state
        .log_since(0)
        .entries
        .into_iter()
        .map(|entry| entry.text)
        .collect()
}

fn rows(titles: &[&str]) -> Vec<TrackRow> {
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| TrackRow::new(i + 1, *t, format!("https://v.example.com/{t}")))
        .collect()
}

#[test]
fn empty_url_is_rejected_with_status() {
    init_logging();
    let (state, effects) = update(ready_state("   ", false), Msg::StartClicked);

    assert!(effects.is_empty());
    assert_eq!(state.status(), "Please enter a URL.");
    assert_eq!(state.phase(), Phase::Idle);
}

#[test]
fn non_http_url_is_rejected_and_logged() {
    init_logging();
    let (state, effects) = update(ready_state("ftp://host/file", false), Msg::StartClicked);

    assert!(effects.is_empty());
    assert_eq!(state.status(), "Invalid URL: ftp://host/file");
    assert_eq!(log_texts(&state), vec!["Invalid URL: ftp://host/file".to_string()]);
}

#[test]
fn single_start_emits_download_with_translated_format() {
    init_logging();
    let state = ready_state(" https://v.example.com/watch?v=1 ", false);
    let (state, _) = update(state, Msg::FormatChanged("webm".to_string()));
    let (state, _) = update(state, Msg::QualityChanged("720p (HD)".to_string()));

    let (mut state, effects) = update(state, Msg::StartClicked);

    assert_eq!(
        effects,
        vec![Effect::DownloadSingle(JobConfig {
            url: "https://v.example.com/watch?v=1".to_string(),
            output_dir: "/home/user/Media".to_string(),
            format_choice: "bestvideo[height<=720][ext=webm]+bestaudio/best".to_string(),
            playlist_mode: false,
            scan_limit: None,
        })]
    );
    assert_eq!(state.phase(), Phase::Running);
    assert_eq!(state.status(), "Downloading…");
    assert_eq!(
        log_texts(&state),
        vec!["Starting: https://v.example.com/watch?v=1".to_string()]
    );
    let view = state.view();
    assert!(!view.can_start);
    assert!(view.can_stop);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());
}

#[test]
fn second_start_while_active_is_ignored() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/a", false),
        vec![Msg::StartClicked, Msg::StartClicked],
    );

    assert_eq!(effects.len(), 1);
    assert_eq!(state.phase(), Phase::Running);
}

#[test]
fn playlist_start_scans_with_limit() {
    init_logging();
    let state = ready_state("https://v.example.com/list", true);
    let (state, _) = update(state, Msg::ScanLimitChanged(5));

    let (state, effects) = update(state, Msg::StartClicked);

    assert_eq!(
        effects,
        vec![Effect::Scan {
            url: "https://v.example.com/list".to_string(),
            limit: NonZeroU32::new(5),
        }]
    );
    assert_eq!(state.phase(), Phase::Scanning);
    assert_eq!(state.status(), "Scanning playlist…");
}

#[test]
fn zero_scan_limit_means_unlimited() {
    init_logging();
    let (_, effects) = update(ready_state("https://v.example.com/list", true), Msg::StartClicked);
    assert_eq!(
        effects,
        vec![Effect::Scan {
            url: "https://v.example.com/list".to_string(),
            limit: None,
        }]
    );
}

#[test]
fn deselecting_one_track_downloads_the_rest_in_order() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::ScanFinished(Ok(rows(&["A", "B", "C"]))),
            Msg::TrackToggled { index: 2 },
            Msg::SelectionConfirmed,
        ],
    );

    let Some(Effect::DownloadPlaylist {
        tracks,
        output_dir,
        format_choice,
    }) = effects.last()
    else {
        panic!("expected a playlist download, got {effects:?}");
    };
    let picked: Vec<(usize, &str)> = tracks.iter().map(|t| (t.index, t.title.as_str())).collect();
    assert_eq!(picked, vec![(1, "A"), (3, "C")]);
    assert_eq!(output_dir, "/home/user/Media");
    assert_eq!(format_choice, "mp3");
    assert_eq!(state.phase(), Phase::Downloading { position: 0, total: 2 });
    assert!(log_texts(&state).contains(&"Downloading 2 track(s)…".to_string()));
}

#[test]
fn empty_confirmed_selection_is_a_cancellation() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::ScanFinished(Ok(rows(&["A", "B"]))),
            Msg::DeselectAllClicked,
            Msg::SelectionConfirmed,
        ],
    );

    assert_eq!(effects.len(), 1, "only the scan effect");
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.status(), "Cancelled.");
    assert_eq!(state.view().last_result, Some(RunResult::Stopped));
}

#[test]
fn renamed_track_keeps_its_index_and_marks_rename() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::ScanFinished(Ok(rows(&["A", "B"]))),
            Msg::TrackRenamed {
                index: 2,
                title: "  B (live)  ".to_string(),
            },
            Msg::TrackRenamed {
                index: 1,
                title: "   ".to_string(),
            },
            Msg::SelectionConfirmed,
        ],
    );

    let Some(Effect::DownloadPlaylist { tracks, .. }) = effects.last() else {
        panic!("expected a playlist download");
    };
    assert_eq!(tracks[0].title, "A");
    assert!(!tracks[0].renamed);
    assert_eq!(tracks[1].index, 2);
    assert_eq!(tracks[1].title, "B (live)");
    assert!(tracks[1].renamed);
    assert_eq!(state.phase(), Phase::Downloading { position: 0, total: 2 });
}

#[test]
fn empty_scan_reports_no_tracks_and_returns_to_idle() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/list", true),
        vec![Msg::StartClicked, Msg::ScanFinished(Ok(Vec::new()))],
    );

    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.status(), "No tracks found.");
    assert!(state.view().can_start);
}

#[test]
fn scan_error_is_logged_and_fails_the_run() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::ScanFinished(Err("Unsupported URL".to_string())),
        ],
    );

    assert_eq!(state.status(), "Scan failed.");
    assert!(log_texts(&state).contains(&"Scan error: Unsupported URL".to_string()));
    assert_eq!(
        state.view().last_result,
        Some(RunResult::Failed("Unsupported URL".to_string()))
    );
}

#[test]
fn stop_during_scan_discards_the_result() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::StopClicked,
            Msg::ScanFinished(Ok(rows(&["A"]))),
        ],
    );

    assert_eq!(effects.last(), Some(&Effect::Stop));
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.selection(), None);
    assert_eq!(state.status(), "Stopped.");
}

#[test]
fn stop_is_sent_once_and_run_finishes_stopped() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/a", false),
        vec![Msg::StartClicked, Msg::StopClicked, Msg::StopClicked],
    );

    assert_eq!(
        effects.iter().filter(|e| **e == Effect::Stop).count(),
        1
    );
    assert_eq!(state.status(), "Stopping…");
    assert!(!state.view().can_stop);

    let (state, _) = update(state, Msg::RunFinished(RunResult::Stopped));
    assert_eq!(state.phase(), Phase::Idle);
    assert!(!state.stop_requested());
    assert_eq!(log_texts(&state).last().map(String::as_str), Some("Stopped."));
}

#[test]
fn completed_playlist_reports_done_and_full_progress() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/list", true),
        vec![
            Msg::StartClicked,
            Msg::ScanFinished(Ok(rows(&["A", "B"]))),
            Msg::SelectionConfirmed,
            Msg::TrackStarted {
                position: 1,
                total: 2,
                title: "A".to_string(),
            },
            Msg::OverallProgress(50),
        ],
    );
    assert_eq!(state.status(), "[1/2] A");
    assert_eq!(state.view().percent, 50);

    let (state, _) = update(state, Msg::RunFinished(RunResult::Completed));
    let view = state.view();
    assert_eq!(view.percent, 100);
    assert_eq!(view.status, "All done ✔");
    assert!(view.can_start);
    assert_eq!(
        log_texts(&state).last().map(String::as_str),
        Some("Download complete!")
    );
}

#[test]
fn failed_run_returns_start_to_enabled() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/a", false),
        vec![
            Msg::StartClicked,
            Msg::LogLine("Error: HTTP Error 403".to_string()),
            Msg::RunFinished(RunResult::Failed("HTTP Error 403".to_string())),
        ],
    );

    assert_eq!(state.status(), "Failed.");
    assert!(state.view().can_start);
}

#[test]
fn transfer_progress_renders_percent_or_unknown_size() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/a", false),
        vec![
            Msg::StartClicked,
            Msg::TransferProgress {
                filename: "clip.webm".to_string(),
                bytes: 420,
                total: Some(1000),
            },
        ],
    );
    let view = state.view();
    assert_eq!(view.progress_line.as_deref(), Some("Downloading: clip.webm 42.0%"));
    assert_eq!(view.percent, 42);

    let (state, _) = update(
        state,
        Msg::TransferProgress {
            filename: "clip.webm".to_string(),
            bytes: 500,
            total: None,
        },
    );
    assert_eq!(
        state.view().progress_line.as_deref(),
        Some("Downloading: clip.webm (size unknown)")
    );
}

#[test]
fn start_rejected_returns_to_idle() {
    init_logging();
    let (state, _) = run(
        ready_state("https://v.example.com/a", false),
        vec![
            Msg::StartClicked,
            Msg::StartRejected("a run is already active".to_string()),
        ],
    );
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(state.status(), "Could not start: a run is already active");
}

#[test]
fn quit_while_running_stops_first() {
    init_logging();
    let (state, effects) = run(
        ready_state("https://v.example.com/a", false),
        vec![Msg::StartClicked, Msg::QuitClicked],
    );
    assert_eq!(&effects[1..], &[Effect::Stop, Effect::Quit]);
    assert!(state.quit_requested());

    let (_, effects) = update(AppState::new(), Msg::QuitClicked);
    assert_eq!(effects, vec![Effect::Quit]);
}

#[test]
fn clear_log_bumps_epoch_and_keeps_serials_increasing() {
    init_logging();
    let (state, _) = run(
        AppState::new(),
        vec![
            Msg::LogLine("one".to_string()),
            Msg::LogLine("two".to_string()),
            Msg::ClearLogClicked,
            Msg::LogLine("three".to_string()),
        ],
    );

    let delta = state.log_since(0);
    assert_eq!(delta.epoch, 1);
    assert_eq!(delta.entries.len(), 1);
    assert_eq!(delta.entries[0].serial, 3);
    assert_eq!(delta.entries[0].text, "three");
    assert!(state.log_since(3).entries.is_empty());
}

#[test]
fn tick_and_noop_change_nothing() {
    init_logging();
    let mut state = AppState::new();
    let _ = state.consume_dirty();
    let before = state.view();

    let (state, effects) = run(state, vec![Msg::Tick, Msg::NoOp]);

    assert!(effects.is_empty());
    assert_eq!(state.view(), before);
}
