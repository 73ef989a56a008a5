use crate::service::PostProcess;

/// Codecs that are produced by extracting the audio track after download.
pub const AUDIO_CODECS: &[&str] = &["mp3", "aac", "m4a", "flac", "wav", "opus", "vorbis"];

/// Target quality handed to the audio extraction step.
pub const AUDIO_QUALITY: &str = "192";

const AUDIO_SOURCE_EXPRESSION: &str = "bestaudio/best";
const DEFAULT_EXPRESSION: &str = "best";

/// Format-selection parameters derived from the user's format choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    pub expression: String,
    pub post_process: Option<PostProcess>,
}

impl FormatSelection {
    /// Audio codec names request the best audio source plus an extraction step,
    /// `default`/`best`/empty request `best`, anything else is a raw expression.
    pub fn from_choice(choice: &str) -> Self {
        let trimmed = choice.trim();
        let lowered = trimmed.to_ascii_lowercase();

        if let Some(codec) = AUDIO_CODECS.iter().find(|codec| **codec == lowered) {
            return Self {
                expression: AUDIO_SOURCE_EXPRESSION.to_string(),
                post_process: Some(PostProcess::ExtractAudio {
                    codec: (*codec).to_string(),
                    quality: AUDIO_QUALITY.to_string(),
                }),
            };
        }

        let expression = match lowered.as_str() {
            "" | "default" | "best" => DEFAULT_EXPRESSION.to_string(),
            _ => trimmed.to_string(),
        };
        Self {
            expression,
            post_process: None,
        }
    }
}
