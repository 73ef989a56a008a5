use crate::{LogEntry, Phase, RunResult, TrackRow};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub url: String,
    pub output_dir: String,
    pub format: String,
    pub quality: String,
    /// The quality selector is only meaningful for video containers.
    pub quality_enabled: bool,
    pub playlist_mode: bool,
    pub scan_limit: u32,
    pub phase: Phase,
    pub status: String,
    pub percent: u8,
    pub progress_line: Option<String>,
    pub last_saved: Option<String>,
    pub last_result: Option<RunResult>,
    pub can_start: bool,
    pub can_stop: bool,
    pub selection: Option<SelectionView>,
    pub log_epoch: u64,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionView {
    pub rows: Vec<TrackRow>,
    pub included: usize,
}

/// New log lines since `after_serial`, plus the clear counter they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogDelta {
    pub epoch: u64,
    pub entries: Vec<LogEntry>,
}
