use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use grabber_logging::{grab_debug, grab_info, grab_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::service::{
    FlatInfo, FlatRecord, HookEvent, MediaService, PostProcess, ProgressHook, ServiceError,
    ServiceRequest,
};

const PROGRESS_MARKER: &str = "[grabber-progress]";
const SAVED_MARKER: &str = "[grabber-saved]";
const FIELD_SEPARATOR: char = '|';
const MISSING_FIELD: &str = "NA";

/// Drives the `yt-dlp` executable as the extraction service.
#[derive(Debug, Clone)]
pub struct YtDlpService {
    program: PathBuf,
}

impl YtDlpService {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn launch_error(&self, err: std::io::Error) -> ServiceError {
        ServiceError::Launch {
            program: self.program.display().to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl MediaService for YtDlpService {
    async fn extract_flat(&self, url: &str, limit: Option<u32>) -> Result<FlatInfo, ServiceError> {
        let args = build_flat_args(url, limit);
        grab_debug!("{} {}", self.program.display(), args.join(" "));

        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|err| self.launch_error(err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_owned).collect();
            return Err(ServiceError::Failed(failure_message(&lines, output.status)));
        }
        parse_flat_json(&String::from_utf8_lossy(&output.stdout))
    }

    async fn download(
        &self,
        request: &ServiceRequest,
        hook: &dyn ProgressHook,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let args = build_download_args(request);
        grab_info!("{} {}", self.program.display(), args.join(" "));

        let mut child = self
            .command(&args)
            .spawn()
            .map_err(|err| self.launch_error(err))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::Failed("failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ServiceError::Failed("failed to capture stderr".to_string()))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stderr_log: Vec<String> = Vec::new();
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    abort_child(&mut child).await;
                    return Err(ServiceError::Aborted);
                }
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        match parse_output_line(&line) {
                            Some(event) => {
                                if hook.on_event(event).is_err() {
                                    abort_child(&mut child).await;
                                    return Err(ServiceError::Aborted);
                                }
                            }
                            None => grab_debug!("yt-dlp: {}", line),
                        }
                    }
                    Ok(None) => stdout_open = false,
                    Err(err) => {
                        grab_warn!("yt-dlp stdout unreadable: {}", err);
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        grab_debug!("yt-dlp stderr: {}", line);
                        stderr_log.push(line);
                    }
                    Ok(None) | Err(_) => stderr_open = false,
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|err| ServiceError::Failed(err.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ServiceError::Failed(failure_message(&stderr_log, status)))
        }
    }
}

async fn abort_child(child: &mut Child) {
    if let Err(err) = child.kill().await {
        grab_warn!("failed to stop yt-dlp: {}", err);
    }
}

fn build_flat_args(url: &str, limit: Option<u32>) -> Vec<String> {
    let mut args = vec![
        "--flat-playlist".to_string(),
        "--dump-single-json".to_string(),
        "--skip-download".to_string(),
        "--no-warnings".to_string(),
    ];
    if let Some(limit) = limit.filter(|l| *l > 0) {
        args.push("--playlist-end".to_string());
        args.push(limit.to_string());
    }
    args.push(url.to_string());
    args
}

fn build_download_args(request: &ServiceRequest) -> Vec<String> {
    let mut args = vec![
        "-f".to_string(),
        request.format.clone(),
        "-o".to_string(),
        request.output_template.clone(),
        "--newline".to_string(),
        "--progress".to_string(),
        "--progress-template".to_string(),
        format!(
            "download:{PROGRESS_MARKER} %(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.filename)s"
        ),
        "--print".to_string(),
        format!("after_move:{SAVED_MARKER} %(filepath)s"),
    ];
    if request.no_playlist {
        args.push("--no-playlist".to_string());
    }
    if let Some(location) = &request.ffmpeg_location {
        args.push("--ffmpeg-location".to_string());
        args.push(location.display().to_string());
    }
    if let Some(PostProcess::ExtractAudio { codec, quality }) = &request.post_process {
        args.push("--extract-audio".to_string());
        args.push("--audio-format".to_string());
        args.push(codec.clone());
        args.push("--audio-quality".to_string());
        args.push(quality.clone());
    }
    args.push(request.url.clone());
    args
}

/// Parses one stdout line produced by the progress template or the print hook.
fn parse_output_line(line: &str) -> Option<HookEvent> {
    let line = line.trim();
    if let Some(path) = line.strip_prefix(SAVED_MARKER) {
        let path = path.trim();
        return (!path.is_empty()).then(|| HookEvent::Saved {
            path: PathBuf::from(path),
        });
    }

    let rest = line.strip_prefix(PROGRESS_MARKER)?.trim_start();
    let mut fields = rest.splitn(5, FIELD_SEPARATOR);
    let status = fields.next()?;
    let downloaded = parse_byte_count(fields.next()?);
    let total = parse_byte_count(fields.next()?);
    let estimate = parse_byte_count(fields.next()?);
    let filename = fields.next()?.to_string();

    match status {
        "downloading" => Some(HookEvent::Downloading {
            filename,
            downloaded: downloaded.unwrap_or(0),
            total: total.or(estimate).filter(|t| *t > 0),
        }),
        "finished" => Some(HookEvent::Finished { filename }),
        _ => None,
    }
}

fn parse_byte_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field.is_empty() || field == MISSING_FIELD {
        return None;
    }
    field
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

fn parse_flat_json(raw: &str) -> Result<FlatInfo, ServiceError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|err| ServiceError::Parse(format!("invalid JSON: {err}")))?;

    let is_collection = value.get("_type").and_then(|t| t.as_str()) == Some("playlist")
        || value.get("entries").is_some_and(|e| e.is_array());

    if !is_collection {
        let record = serde_json::from_value::<FlatRecord>(value)
            .map_err(|err| ServiceError::Parse(err.to_string()))?;
        return Ok(FlatInfo::Single(record));
    }

    let entries = value
        .get("entries")
        .and_then(|e| e.as_array())
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    if item.is_null() {
                        None
                    } else {
                        serde_json::from_value::<FlatRecord>(item.clone()).ok()
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(FlatInfo::Collection(entries))
}

fn failure_message(stderr: &[String], status: ExitStatus) -> String {
    let errors: Vec<&str> = stderr
        .iter()
        .map(|line| line.trim())
        .filter(|line| line.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return errors.join("\n");
    }
    stderr
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("yt-dlp exited with {status}"))
}
