//! Grabber engine: extraction adapter, direct fetcher, playlist pipeline and
//! the background worker that runs them.
mod adapter;
mod engine;
mod fetch;
mod filename;
mod format;
mod persist;
mod pipeline;
mod service;
mod types;
mod ytdlp;

pub use adapter::{DownloadError, ExtractionError, MediaAdapter, ServiceAdapter, TrackRequest};
pub use engine::{EngineConfig, EngineError, EngineHandle, SingleJob};
pub use fetch::{
    direct_fetch_satisfies, is_direct_media_url, ChannelProgressSink, FetchSettings, Fetcher,
    ProgressSink, ReqwestFetcher, DIRECT_MEDIA_EXTENSIONS,
};
pub use filename::{safe_filename_from_url, sanitize_file_stem};
pub use format::{FormatSelection, AUDIO_CODECS, AUDIO_QUALITY};
pub use persist::{ensure_output_dir, write_file_atomically, PersistError};
pub use pipeline::{run_direct, run_playlist, run_single, RunContext};
pub use service::{
    FlatInfo, FlatRecord, HookAbort, HookEvent, MediaService, PostProcess, ProgressHook,
    ServiceError, ServiceRequest,
};
pub use tokio_util::sync::CancellationToken;
pub use types::{EngineEvent, FailureKind, FetchError, FetchOutput, RunOutcome, TrackEntry};
pub use ytdlp::YtDlpService;
