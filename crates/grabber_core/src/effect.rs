use std::num::NonZeroU32;

use crate::{JobConfig, TrackRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Scan {
        url: String,
        limit: Option<NonZeroU32>,
    },
    DownloadSingle(JobConfig),
    DownloadPlaylist {
        tracks: Vec<TrackRow>,
        output_dir: String,
        format_choice: String,
    },
    /// Cancel the active run.
    Stop,
    Quit,
}
