pub mod console;
pub mod constants;
pub mod gui;
pub mod log_pane;
