use std::time::Duration;

pub const WINDOW_TITLE: &str = "Grabber";
pub const WINDOW_SIZE: [f32; 2] = [820.0, 640.0];
pub const SELECTION_WINDOW_SIZE: [f32; 2] = [560.0, 420.0];

/// How often the GUI repaints while idle to pick up engine events.
pub const REPAINT_INTERVAL: Duration = Duration::from_millis(100);
/// How long the console loop waits for an engine event per iteration.
pub const CONSOLE_POLL: Duration = Duration::from_millis(100);

/// Lines kept by a front-end's activity log.
pub const LOG_PANE_CAPACITY: usize = 2_000;
pub const SCAN_LIMIT_MAX: u32 = 10_000;
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";
