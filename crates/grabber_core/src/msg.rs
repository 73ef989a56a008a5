use crate::{RunResult, TrackRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the URL field.
    UrlChanged(String),
    OutputDirChanged(String),
    FormatChanged(String),
    QualityChanged(String),
    PlaylistToggled(bool),
    /// Playlist scan limit; 0 means unlimited.
    ScanLimitChanged(u32),
    StartClicked,
    StopClicked,
    ClearLogClicked,
    QuitClicked,
    /// Selection stage: include toggle of the row with this scan index.
    TrackToggled { index: usize },
    TrackRenamed { index: usize, title: String },
    SelectAllClicked,
    DeselectAllClicked,
    SelectionConfirmed,
    SelectionCancelled,
    /// Engine finished a scan.
    ScanFinished(Result<Vec<TrackRow>, String>),
    /// Engine moved on to the next playlist track.
    TrackStarted {
        position: usize,
        total: usize,
        title: String,
    },
    /// Byte progress of the file in flight.
    TransferProgress {
        filename: String,
        bytes: u64,
        total: Option<u64>,
    },
    /// Activity line produced by the engine.
    LogLine(String),
    FileSaved(String),
    OverallProgress(u8),
    RunFinished(RunResult),
    /// The engine refused to start the requested run.
    StartRejected(String),
    /// Render tick.
    Tick,
    NoOp,
}
