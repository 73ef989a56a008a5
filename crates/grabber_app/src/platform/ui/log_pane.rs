use std::collections::VecDeque;

use grabber_core::LogDelta;

use super::constants::{LOG_PANE_CAPACITY, TIMESTAMP_FORMAT};

/// Timestamped copy of the activity log, stamped when a line is first seen.
#[derive(Debug, Default)]
pub struct LogPane {
    epoch: u64,
    last_serial: u64,
    lines: VecDeque<String>,
}

impl LogPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_serial(&self) -> u64 {
        self.last_serial
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Appends the delta and returns the newly stamped lines.
    pub fn sync(&mut self, delta: LogDelta) -> Vec<String> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.sync_at(delta, &stamp)
    }

    fn sync_at(&mut self, delta: LogDelta, stamp: &str) -> Vec<String> {
        if delta.epoch != self.epoch {
            self.epoch = delta.epoch;
            self.lines.clear();
        }
        let mut added = Vec::with_capacity(delta.entries.len());
        for entry in delta.entries {
            self.last_serial = self.last_serial.max(entry.serial);
            let line = format!("[{stamp}] {}", entry.text);
            added.push(line.clone());
            self.lines.push_back(line);
        }
        while self.lines.len() > LOG_PANE_CAPACITY {
            self.lines.pop_front();
        }
        added
    }
}
