//! Session snapshot and display mirror.

use crate::level::BrightnessLevel;
use crate::modes::BrightnessMode;

/// The brightness settings active when a session opened.
///
/// Captured once by [`BrightnessController::start`](crate::BrightnessController::start)
/// and only read afterwards, by revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    level: BrightnessLevel,
    mode: BrightnessMode,
}

impl SessionSnapshot {
    pub(crate) fn new(level: BrightnessLevel, mode: BrightnessMode) -> Self {
        Self { level, mode }
    }

    /// Level at session start.
    pub fn level(&self) -> BrightnessLevel {
        self.level
    }

    /// Mode at session start.
    pub fn mode(&self) -> BrightnessMode {
        self.mode
    }
}

/// What the UI should currently show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Slider level, in canonical units.
    pub level: BrightnessLevel,
    /// Auto-brightness switch position.
    pub mode: BrightnessMode,
}

impl DisplayState {
    /// Whether the auto-brightness switch renders checked.
    pub fn is_automatic(&self) -> bool {
        self.mode.is_automatic()
    }
}

impl From<SessionSnapshot> for DisplayState {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            level: snapshot.level,
            mode: snapshot.mode,
        }
    }
}
