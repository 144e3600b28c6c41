//! Voice configuration, loaded once at startup and shared read-only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TtsError;

pub const DEFAULT_VOICE_ID: &str = "2c5f135cb33f49a2c8882d";
pub const DEFAULT_PROVIDER: &str = "supertone";
pub const DEFAULT_LANGUAGE: &str = "ko";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceStyle {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Excited,
}

impl VoiceStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceStyle::Neutral => "neutral",
            VoiceStyle::Happy => "happy",
            VoiceStyle::Sad => "sad",
            VoiceStyle::Angry => "angry",
            VoiceStyle::Excited => "excited",
        }
    }

    /// Unknown or empty names fall back to [`VoiceStyle::Neutral`].
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => VoiceStyle::Happy,
            "sad" => VoiceStyle::Sad,
            "angry" => VoiceStyle::Angry,
            "excited" => VoiceStyle::Excited,
            _ => VoiceStyle::Neutral,
        }
    }
}

impl fmt::Display for VoiceStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Pcm,
}

impl AudioFormat {
    /// Lowercase name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm => "pcm",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Pcm => "audio/pcm",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "pcm" => Ok(AudioFormat::Pcm),
            other => Err(TtsError::Config(format!("unsupported audio format: {}", other))),
        }
    }
}

/// Prosody settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub pitch_shift: i32,
    pub pitch_variance: f64,
    pub speed: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            pitch_shift: 0,
            pitch_variance: 1.0,
            speed: 1.1,
        }
    }
}

impl VoiceSettings {
    pub fn validate(&self) -> Result<(), TtsError> {
        if self.pitch_variance.is_nan() || self.pitch_variance <= 0.0 {
            return Err(TtsError::Config("pitch_variance must be > 0".to_string()));
        }
        if self.speed.is_nan() || self.speed <= 0.0 {
            return Err(TtsError::Config("speed must be > 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub settings: VoiceSettings,
    pub language: String,
    pub style: VoiceStyle,
    pub output_format: AudioFormat,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            id: DEFAULT_VOICE_ID.to_string(),
            name: "default".to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            settings: VoiceSettings::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            style: VoiceStyle::Neutral,
            output_format: AudioFormat::Wav,
        }
    }
}

impl Voice {
    pub fn validate(&self) -> Result<(), TtsError> {
        if self.id.trim().is_empty() {
            return Err(TtsError::Config("voice id must not be blank".to_string()));
        }
        if self.language.trim().is_empty() {
            return Err(TtsError::Config("voice language must not be blank".to_string()));
        }
        self.settings.validate()
    }
}
