//! Format selector contents and the translation of a form choice into the
//! string handed to the engine.

/// Choice used when the user has not picked a specific format.
pub const DEFAULT_FORMAT: &str = "default";

pub const AUDIO_FORMATS: &[&str] = &["mp3", "aac", "m4a", "flac", "wav", "opus", "vorbis"];

pub const VIDEO_CONTAINERS: &[&str] = &["mp4", "webm", "mkv"];

pub const BEST_QUALITY: &str = "Best available";

/// Video quality labels and the height cap each one stands for.
pub const QUALITY_LABELS: &[(&str, Option<u32>)] = &[
    (BEST_QUALITY, None),
    ("4K (2160p)", Some(2160)),
    ("1440p", Some(1440)),
    ("1080p (FHD)", Some(1080)),
    ("720p (HD)", Some(720)),
    ("480p", Some(480)),
    ("360p", Some(360)),
    ("240p", Some(240)),
    ("144p", Some(144)),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatGroup {
    Auto,
    Audio,
    Video,
}

impl FormatGroup {
    pub fn label(self) -> &'static str {
        match self {
            FormatGroup::Auto => "Auto",
            FormatGroup::Audio => "Audio",
            FormatGroup::Video => "Video",
        }
    }

    pub fn formats(self) -> &'static [&'static str] {
        match self {
            FormatGroup::Auto => &[DEFAULT_FORMAT],
            FormatGroup::Audio => AUDIO_FORMATS,
            FormatGroup::Video => VIDEO_CONTAINERS,
        }
    }
}

/// Selector groups in display order.
pub const FORMAT_GROUPS: [FormatGroup; 3] = [FormatGroup::Auto, FormatGroup::Audio, FormatGroup::Video];

pub fn is_known_format(format: &str) -> bool {
    FORMAT_GROUPS
        .iter()
        .any(|group| group.formats().contains(&format))
}

/// The quality selector only applies to video containers.
pub fn is_video_container(format: &str) -> bool {
    VIDEO_CONTAINERS.contains(&format.to_ascii_lowercase().as_str())
}

/// Format expression for a video container at the given quality label.
///
/// Unknown labels fall back to `best`.
pub fn video_format_expression(container: &str, quality: &str) -> String {
    match QUALITY_LABELS.iter().find(|(label, _)| *label == quality) {
        Some((_, None)) => {
            format!("bestvideo[ext={container}]+bestaudio/best[ext={container}]/best")
        }
        Some((_, Some(height))) => {
            format!("bestvideo[height<={height}][ext={container}]+bestaudio/best")
        }
        None => "best".to_string(),
    }
}

/// Translates the form's format and quality into the engine's format choice.
pub fn format_choice(format: &str, quality: &str) -> String {
    let format = format.trim().to_ascii_lowercase();
    if format.is_empty() {
        return "best".to_string();
    }
    if is_video_container(&format) {
        return video_format_expression(&format, quality);
    }
    format
}
