//! Grabber core: pure state machine, track selection and format helpers.
mod effect;
mod format;
mod msg;
mod selection;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use format::{
    format_choice, is_known_format, is_video_container, video_format_expression, FormatGroup,
    AUDIO_FORMATS, BEST_QUALITY, DEFAULT_FORMAT, FORMAT_GROUPS, QUALITY_LABELS, VIDEO_CONTAINERS,
};
pub use msg::Msg;
pub use selection::{TrackRow, TrackSelection};
pub use state::{AppState, FormState, JobConfig, LogEntry, Phase, RunResult, LOG_CAPACITY};
pub use update::update;
pub use view_model::{AppViewModel, LogDelta, SelectionView};
