use std::collections::VecDeque;
use std::num::NonZeroU32;

use crate::format::{format_choice, is_video_container, BEST_QUALITY, DEFAULT_FORMAT};
use crate::view_model::{AppViewModel, LogDelta, SelectionView};
use crate::TrackSelection;

/// Oldest lines are dropped once the activity log grows past this.
pub const LOG_CAPACITY: usize = 2_000;

/// Editable fields of the job form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub url: String,
    pub output_dir: String,
    pub format: String,
    pub quality: String,
    pub playlist_mode: bool,
    /// 0 means unlimited.
    pub scan_limit: u32,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            url: String::new(),
            output_dir: String::new(),
            format: DEFAULT_FORMAT.to_string(),
            quality: BEST_QUALITY.to_string(),
            playlist_mode: false,
            scan_limit: 0,
        }
    }
}

/// Snapshot of the form taken when a run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub url: String,
    pub output_dir: String,
    pub format_choice: String,
    pub playlist_mode: bool,
    pub scan_limit: Option<NonZeroU32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Scanning,
    Selecting,
    /// Playlist download; `position` is 0 until the first track starts.
    Downloading { position: usize, total: usize },
    /// Single item or direct link download.
    Running,
}

impl Phase {
    /// A run is executing on the engine.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Phase::Scanning | Phase::Downloading { .. } | Phase::Running
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Completed,
    Stopped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub serial: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    form: FormState,
    phase: Phase,
    job: Option<JobConfig>,
    selection: Option<TrackSelection>,
    stop_requested: bool,
    quit_requested: bool,
    status: String,
    percent: u8,
    progress_line: Option<String>,
    last_saved: Option<String>,
    last_result: Option<RunResult>,
    log: VecDeque<LogEntry>,
    log_serial: u64,
    log_epoch: u64,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_form(FormState::default())
    }

    pub fn with_form(form: FormState) -> Self {
        Self {
            form,
            status: "Ready.".to_string(),
            ..Self::default()
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job(&self) -> Option<&JobConfig> {
        self.job.as_ref()
    }

    pub fn selection(&self) -> Option<&TrackSelection> {
        self.selection.as_ref()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            url: self.form.url.clone(),
            output_dir: self.form.output_dir.clone(),
            format: self.form.format.clone(),
            quality: self.form.quality.clone(),
            quality_enabled: is_video_container(&self.form.format),
            playlist_mode: self.form.playlist_mode,
            scan_limit: self.form.scan_limit,
            phase: self.phase,
            status: self.status.clone(),
            percent: self.percent,
            progress_line: self.progress_line.clone(),
            last_saved: self.last_saved.clone(),
            last_result: self.last_result.clone(),
            can_start: self.phase == Phase::Idle,
            can_stop: self.phase.is_active() && !self.stop_requested,
            selection: self.selection.as_ref().map(|selection| SelectionView {
                rows: selection.rows().to_vec(),
                included: selection.included_count(),
            }),
            log_epoch: self.log_epoch,
            dirty: self.dirty,
        }
    }

    /// Log lines with a serial greater than `after_serial`.
    pub fn log_since(&self, after_serial: u64) -> LogDelta {
        LogDelta {
            epoch: self.log_epoch,
            entries: self
                .log
                .iter()
                .filter(|entry| entry.serial > after_serial)
                .cloned()
                .collect(),
        }
    }

    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Returns whether state changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn form_mut(&mut self) -> &mut FormState {
        self.dirty = true;
        &mut self.form
    }

    pub(crate) fn push_log(&mut self, text: impl Into<String>) {
        self.log_serial += 1;
        self.log.push_back(LogEntry {
            serial: self.log_serial,
            text: text.into(),
        });
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
        self.dirty = true;
    }

    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
        self.log_epoch += 1;
        self.dirty = true;
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.dirty = true;
    }

    pub(crate) fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
        self.dirty = true;
    }

    pub(crate) fn set_progress_line(&mut self, line: Option<String>) {
        self.progress_line = line;
        self.dirty = true;
    }

    pub(crate) fn set_last_saved(&mut self, path: String) {
        self.last_saved = Some(path);
        self.dirty = true;
    }

    /// Snapshots the form into a job. Fails with the status text to show.
    pub(crate) fn job_from_form(&self) -> Result<JobConfig, String> {
        let url = self.form.url.trim();
        if url.is_empty() {
            return Err("Please enter a URL.".to_string());
        }
        match url::Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(format!("Invalid URL: {url}")),
        }
        let output_dir = self.form.output_dir.trim();
        if output_dir.is_empty() {
            return Err("Please choose an output folder.".to_string());
        }
        Ok(JobConfig {
            url: url.to_string(),
            output_dir: output_dir.to_string(),
            format_choice: format_choice(&self.form.format, &self.form.quality),
            playlist_mode: self.form.playlist_mode,
            scan_limit: NonZeroU32::new(self.form.scan_limit),
        })
    }

    pub(crate) fn begin_run(&mut self, phase: Phase, job: JobConfig) {
        self.phase = phase;
        self.job = Some(job);
        self.stop_requested = false;
        self.percent = 0;
        self.progress_line = None;
        self.last_saved = None;
        self.last_result = None;
        self.dirty = true;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.dirty = true;
    }

    pub(crate) fn open_selection(&mut self, selection: TrackSelection) {
        self.selection = Some(selection);
        self.phase = Phase::Selecting;
        self.dirty = true;
    }

    pub(crate) fn selection_mut(&mut self) -> Option<&mut TrackSelection> {
        self.selection.as_mut()
    }

    pub(crate) fn take_selection(&mut self) -> Option<TrackSelection> {
        self.dirty = true;
        self.selection.take()
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop_requested = true;
        self.dirty = true;
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit_requested = true;
        self.dirty = true;
    }

    /// Back to idle after a terminal outcome.
    pub(crate) fn finish_run(&mut self, result: Option<RunResult>) {
        self.phase = Phase::Idle;
        self.selection = None;
        self.stop_requested = false;
        self.progress_line = None;
        if result.is_some() {
            self.last_result = result;
        }
        self.dirty = true;
    }
}
