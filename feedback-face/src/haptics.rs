use std::fmt;

use thiserror::Error;
use tracing::info;

/// Which outputs a feedback uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackPattern {
    All,
    Vibration,
    Sound,
}

impl FeedbackPattern {
    /// Pattern for the two user flags, or `None` when both are off.
    pub fn from_flags(vibration: bool, sound: bool) -> Option<Self> {
        match (vibration, sound) {
            (true, true) => Some(FeedbackPattern::All),
            (true, false) => Some(FeedbackPattern::Vibration),
            (false, true) => Some(FeedbackPattern::Sound),
            (false, false) => None,
        }
    }
}

impl fmt::Display for FeedbackPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeedbackPattern::All => "all",
            FeedbackPattern::Vibration => "vibration",
            FeedbackPattern::Sound => "sound",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HapticError {
    #[error("haptic output is not supported on this device")]
    Unsupported,
    #[error("pattern '{0}' is not supported")]
    UnsupportedPattern(String),
}

/// Vibration motor and speaker.
pub trait HapticOutput: Send {
    fn play(&mut self, feedback: FeedbackPattern) -> Result<(), HapticError>;
}

/// Reports every feedback through the log instead of a device.
#[derive(Debug, Clone)]
pub struct LogHaptics {
    pattern: String,
}

impl LogHaptics {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

impl HapticOutput for LogHaptics {
    fn play(&mut self, feedback: FeedbackPattern) -> Result<(), HapticError> {
        if self.pattern.is_empty() {
            return Err(HapticError::UnsupportedPattern(self.pattern.clone()));
        }
        info!(%feedback, pattern = %self.pattern, "Playing feedback");
        Ok(())
    }
}

/// A device without haptic hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

impl HapticOutput for NoHaptics {
    fn play(&mut self, _feedback: FeedbackPattern) -> Result<(), HapticError> {
        Err(HapticError::Unsupported)
    }
}
