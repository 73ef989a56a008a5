use std::collections::VecDeque;
use std::time::Duration;

use grabber_core::{update, AppState, AppViewModel, FormState, LogDelta, Msg};

use super::effects::EffectRunner;
use super::settings::SettingsStore;

/// Owns the core state and drives it from both front-ends.
pub struct AppController {
    state: AppState,
    runner: EffectRunner,
    settings: SettingsStore,
    closed: bool,
}

impl AppController {
    pub fn new(runner: EffectRunner, settings: SettingsStore, form: FormState) -> Self {
        Self {
            state: AppState::with_form(form),
            runner,
            settings,
            closed: false,
        }
    }

    /// Applies a message and everything it leads to.
    pub fn dispatch(&mut self, msg: Msg) {
        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            if !effects.is_empty() {
                inbox.extend(self.runner.run(effects));
            }
        }
    }

    /// Feeds pending engine events into the state. Returns whether any arrived.
    pub fn pump(&mut self) -> bool {
        let msgs = self.runner.poll();
        let any = !msgs.is_empty();
        for msg in msgs {
            self.dispatch(msg);
        }
        any
    }

    /// Blocks up to `timeout` for one engine event.
    pub fn pump_wait(&mut self, timeout: Duration) -> bool {
        match self.runner.wait(timeout) {
            Some(msg) => {
                self.dispatch(msg);
                self.pump();
                true
            }
            None => false,
        }
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn log_since(&self, after_serial: u64) -> LogDelta {
        self.state.log_since(after_serial)
    }

    /// Returns whether anything changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    pub fn quit_requested(&self) -> bool {
        self.runner.quit_requested()
    }

    /// Stops any active run and saves the form. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if !self.quit_requested() {
            self.dispatch(Msg::QuitClicked);
        }
        self.settings.persist_form(self.state.form());
    }
}
