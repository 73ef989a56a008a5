use std::fmt;
use std::path::PathBuf;

use crate::adapter::ExtractionError;

/// One item found by a playlist scan.
///
/// `index` is the 1-based position in the scan result and stays stable while
/// the user edits the selection. `title` may be replaced by a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub index: usize,
    pub title: String,
    pub source_url: String,
    pub id: String,
    /// Set when the user renamed the entry; the title then names the output file.
    pub renamed: bool,
}

impl TrackEntry {
    pub fn new(index: usize, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            source_url: source_url.into(),
            id: String::new(),
            renamed: false,
        }
    }

    pub fn title_override(&self) -> Option<&str> {
        self.renamed.then_some(self.title.as_str())
    }
}

/// Terminal state of one run, reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Byte progress of the transfer in flight. `total` is `None` when unknown.
    Progress {
        filename: String,
        bytes: u64,
        total: Option<u64>,
    },
    /// Human-readable activity line.
    LogLine(String),
    /// A file reached its final location.
    Finished { path: PathBuf },
    /// A playlist track is about to be downloaded (`position` is 1-based).
    TrackStarted {
        position: usize,
        total: usize,
        title: String,
    },
    /// Aggregate progress of the whole run.
    Overall { percent: u8 },
    ScanCompleted(Result<Vec<TrackEntry>, ExtractionError>),
    RunCompleted(RunOutcome),
}

impl EngineEvent {
    /// True for the last event a run produces.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineEvent::ScanCompleted(_) | EngineEvent::RunCompleted(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub path: PathBuf,
    pub final_url: String,
    pub bytes_written: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::new(FailureKind::Io, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
