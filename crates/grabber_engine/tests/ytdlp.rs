#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use grabber_engine::{
    CancellationToken, HookAbort, HookEvent, MediaService, ProgressHook, ServiceError,
    ServiceRequest, YtDlpService,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

/// Collects hook events; optionally refuses the first download event.
#[derive(Default)]
struct RecordingHook {
    events: Mutex<Vec<HookEvent>>,
    abort_on_progress: bool,
}

impl RecordingHook {
    fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHook for RecordingHook {
    fn on_event(&self, event: HookEvent) -> Result<(), HookAbort> {
        let refuse = self.abort_on_progress && matches!(event, HookEvent::Downloading { .. });
        self.events.lock().unwrap().push(event);
        if refuse {
            Err(HookAbort)
        } else {
            Ok(())
        }
    }
}

/// Writes an executable stand-in for yt-dlp that ignores its arguments.
fn fake_ytdlp(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("fake-yt-dlp");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn request(output_dir: &Path) -> ServiceRequest {
    ServiceRequest {
        url: "https://video.example.com/watch?v=1".to_string(),
        format: "best".to_string(),
        output_template: output_dir.join("%(title)s.%(ext)s").display().to_string(),
        no_playlist: true,
        ffmpeg_location: None,
        post_process: None,
    }
}

#[tokio::test]
async fn progress_and_saved_lines_reach_the_hook() {
    grabber_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let program = fake_ytdlp(
        &temp,
        r#"echo "[youtube] 1: Downloading webpage"
echo "[grabber-progress] downloading|512|2048|NA|/out/Song.webm"
echo "[grabber-progress] finished|2048|2048|NA|/out/Song.webm"
echo "[grabber-saved] /out/Song.webm"
echo "WARNING: chatter on stderr" >&2
exit 0"#,
    );
    let service = YtDlpService::new(program);
    let hook = RecordingHook::default();

    service
        .download(&request(temp.path()), &hook, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        hook.events(),
        vec![
            HookEvent::Downloading {
                filename: "/out/Song.webm".to_string(),
                downloaded: 512,
                total: Some(2048),
            },
            HookEvent::Finished {
                filename: "/out/Song.webm".to_string(),
            },
            HookEvent::Saved {
                path: PathBuf::from("/out/Song.webm"),
            },
        ]
    );
}

#[tokio::test]
async fn cancelling_the_token_kills_a_running_download() {
    grabber_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let program = fake_ytdlp(
        &temp,
        r#"echo "[grabber-progress] downloading|1|100|NA|/out/slow.webm"
exec sleep 30"#,
    );
    let service = YtDlpService::new(program);
    let hook = RecordingHook::default();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        service.download(&request(temp.path()), &hook, &cancel),
    )
    .await
    .expect("download should end soon after cancellation");

    assert_eq!(result, Err(ServiceError::Aborted));
}

#[tokio::test]
async fn hook_refusal_aborts_the_download() {
    grabber_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let program = fake_ytdlp(
        &temp,
        r#"echo "[grabber-progress] downloading|1|100|NA|/out/slow.webm"
exec sleep 30"#,
    );
    let service = YtDlpService::new(program);
    let hook = RecordingHook {
        abort_on_progress: true,
        ..RecordingHook::default()
    };

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        service.download(&request(temp.path()), &hook, &CancellationToken::new()),
    )
    .await
    .expect("download should end once the hook refuses");

    assert_eq!(result, Err(ServiceError::Aborted));
    assert_eq!(hook.events().len(), 1);
}

#[tokio::test]
async fn stderr_error_lines_become_a_conversion_failure() {
    grabber_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let program = fake_ytdlp(
        &temp,
        r#"echo "WARNING: something minor" >&2
echo "ERROR: Postprocessing: ffmpeg not found. Please install or provide the path" >&2
exit 1"#,
    );
    let service = YtDlpService::new(program);

    let err = service
        .download(
            &request(temp.path()),
            &RecordingHook::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ServiceError::Failed(
            "ERROR: Postprocessing: ffmpeg not found. Please install or provide the path"
                .to_string()
        )
    );
    assert!(err.is_conversion_failure());
}

#[tokio::test]
async fn silent_failure_reports_the_exit_status() {
    grabber_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let program = fake_ytdlp(&temp, "exit 3");
    let service = YtDlpService::new(program);

    let err = service
        .download(
            &request(temp.path()),
            &RecordingHook::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::Failed(message) => assert!(message.contains("exited with"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_program_is_a_launch_error() {
    let temp = TempDir::new().unwrap();
    let service = YtDlpService::new(temp.path().join("no-such-yt-dlp"));

    let err = service
        .download(
            &request(temp.path()),
            &RecordingHook::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Launch { .. }));
}
