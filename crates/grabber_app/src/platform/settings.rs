//! Persisted form settings and tool locations.
//!
//! Stored as RON in `<config dir>/grabber/settings.ron`. A missing or
//! unreadable file yields defaults; the app never fails to start over it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use grabber_core::{FormState, BEST_QUALITY, DEFAULT_FORMAT};
use grabber_engine::{write_file_atomically, EngineConfig};
use grabber_logging::{grab_info, grab_warn};
use serde::{Deserialize, Serialize};

const SETTINGS_FILENAME: &str = "settings.ron";
const APP_DIR: &str = "grabber";
pub const ENV_YTDLP: &str = "GRABBER_YTDLP";
pub const ENV_FFMPEG: &str = "GRABBER_FFMPEG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub format: String,
    pub quality: String,
    pub playlist_mode: bool,
    pub scan_limit: u32,
    /// Extraction service executable; looked up on `PATH` when unset.
    pub ytdlp_path: Option<PathBuf>,
    pub ffmpeg_location: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: DEFAULT_FORMAT.to_string(),
            quality: BEST_QUALITY.to_string(),
            playlist_mode: false,
            scan_limit: 0,
            ytdlp_path: None,
            ffmpeg_location: None,
        }
    }
}

impl Settings {
    /// Applies `GRABBER_YTDLP` / `GRABBER_FFMPEG` style overrides.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_YTDLP).filter(|v| !v.trim().is_empty()) {
            self.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_FFMPEG).filter(|v| !v.trim().is_empty()) {
            self.ffmpeg_location = Some(PathBuf::from(path));
        }
        self
    }

    pub fn form_state(&self) -> FormState {
        FormState {
            url: String::new(),
            output_dir: self.output_dir.display().to_string(),
            format: self.format.clone(),
            quality: self.quality.clone(),
            playlist_mode: self.playlist_mode,
            scan_limit: self.scan_limit,
        }
    }

    /// Copies the persisted form fields back. The URL is not remembered.
    pub fn update_from_form(&mut self, form: &FormState) {
        let dir = form.output_dir.trim();
        if !dir.is_empty() {
            self.output_dir = PathBuf::from(dir);
        }
        self.format = form.format.clone();
        self.quality = form.quality.clone();
        self.playlist_mode = form.playlist_mode;
        self.scan_limit = form.scan_limit;
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(path) = &self.ytdlp_path {
            config.ytdlp_path = path.clone();
        }
        config.ffmpeg_location = self.ffmpeg_location.clone();
        config
    }
}

pub fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Media")
}

/// `<config dir>/grabber`, when the platform has a config directory.
pub fn settings_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

pub fn load(dir: &Path) -> Settings {
    let path = dir.join(SETTINGS_FILENAME);
    match read_settings(&path) {
        Ok(Some(settings)) => {
            grab_info!("loaded settings from {:?}", path);
            settings
        }
        Ok(None) => Settings::default(),
        Err(err) => {
            grab_warn!("using default settings: {:#}", err);
            Settings::default()
        }
    }
}

fn read_settings(path: &Path) -> anyhow::Result<Option<Settings>> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
    };
    let settings =
        ron::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(settings))
}

pub fn save(dir: &Path, settings: &Settings) -> anyhow::Result<PathBuf> {
    let content = ron::ser::to_string_pretty(settings, ron::ser::PrettyConfig::new())
        .context("serializing settings")?;
    let path = dir.join(SETTINGS_FILENAME);
    write_file_atomically(&path, &content)
        .with_context(|| format!("writing settings to {}", dir.display()))?;
    grab_info!("saved settings to {:?}", path);
    Ok(path)
}

/// Loaded settings plus where they go back to.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: Option<PathBuf>,
    settings: Settings,
}

impl SettingsStore {
    pub fn open(dir: Option<PathBuf>) -> Self {
        let settings = dir.as_deref().map(load).unwrap_or_default();
        Self { dir, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Remembers the form and writes the file. Failures are logged only.
    pub fn persist_form(&mut self, form: &FormState) {
        self.settings.update_from_form(form);
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(err) = save(dir, &self.settings) {
            grab_warn!("could not save settings: {:#}", err);
        }
    }
}
