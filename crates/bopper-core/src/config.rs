//! Decode and playback configuration.
//!
//! Decode defaults are the lenient choices; the alternatives follow the GIF
//! rules more strictly. A `BopperConfig` can be loaded from JSON with any
//! field omitted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::playback::{PlaybackDirection, Tempo};

/// Treatment of frames whose disposal method is `RestorePrevious`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviousDisposal {
    /// Leave the canvas as drawn, like `DoNotDispose`.
    #[default]
    Keep,
    /// Restore the canvas snapshot taken before the frame was drawn.
    Restore,
}

/// Treatment of pixels carrying the frame's transparent index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransparencyMode {
    /// Leave the canvas pixel untouched.
    #[default]
    ShowThrough,
    /// Overwrite the canvas pixel with (0, 0, 0, 0).
    Clear,
}

/// Reaction to a block tag that is neither extension, image nor trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownBlockPolicy {
    /// Stop parsing and keep the frames collected so far.
    #[default]
    Stop,
    /// Fail the decode with `GifError::UnknownBlock`.
    Error,
}

/// Options for the container parser and frame compositor.
///
/// # Examples
/// ```
/// use bopper_core::{DecodeOptions, PreviousDisposal};
///
/// let options: DecodeOptions =
///     serde_json::from_str(r#"{"previous_disposal":"restore"}"#).unwrap();
/// assert_eq!(options.previous_disposal, PreviousDisposal::Restore);
/// assert_eq!(options.transparency, Default::default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub previous_disposal: PreviousDisposal,
    pub transparency: TransparencyMode,
    pub unknown_blocks: UnknownBlockPolicy,
}

/// Tempo inputs for the beat clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub bpm: u16,
    pub speed_divisor: u32,
    pub direction: PlaybackDirection,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            bpm: Tempo::DEFAULT_BPM,
            speed_divisor: 1,
            direction: PlaybackDirection::Forward,
        }
    }
}

impl PlaybackConfig {
    /// Clamp the BPM into range and reject a zero speed divisor.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.speed_divisor == 0 {
            return Err(ConfigError::InvalidSpeedDivisor {
                value: self.speed_divisor,
            });
        }
        Ok(Self {
            bpm: Tempo::new(self.bpm).bpm(),
            ..self
        })
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BopperConfig {
    pub decode: DecodeOptions,
    pub playback: PlaybackConfig,
}

impl BopperConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BopperConfig = serde_json::from_str(json)?;
        Ok(Self {
            playback: config.playback.validated()?,
            ..config
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid speed divisor: {value} (must be at least 1)")]
    InvalidSpeedDivisor { value: u32 },
}
