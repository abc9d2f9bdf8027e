//! Brightness levels, the UI clamp range and UI scale conversion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Lowest level the UI may request.
pub const MIN_BRIGHTNESS: i32 = 10;
/// Highest level the UI may request.
pub const MAX_BRIGHTNESS: i32 = 255;

/// A canonical brightness value as stored by the platform.
///
/// Values read from a store are never clamped, they may fall outside
/// [`BrightnessRange`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrightnessLevel(i32);

impl BrightnessLevel {
    /// Wrap a raw canonical value.
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// The raw canonical value.
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for BrightnessLevel {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for BrightnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Inclusive bounds applied when a UI request becomes a canonical write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrightnessRange {
    /// Lower bound.
    pub min: i32,
    /// Upper bound.
    pub max: i32,
}

impl BrightnessRange {
    /// Create a range.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidRange`] if `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self, ControllerError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Check that the bounds are ordered.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.min > self.max {
            return Err(ControllerError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Clamp a requested value into the range.
    pub fn clamp(&self, value: i32) -> BrightnessLevel {
        BrightnessLevel(value.max(self.min).min(self.max))
    }

    /// Whether a level lies within the range.
    pub fn contains(&self, level: BrightnessLevel) -> bool {
        (self.min..=self.max).contains(&level.get())
    }
}

impl Default for BrightnessRange {
    fn default() -> Self {
        Self {
            min: MIN_BRIGHTNESS,
            max: MAX_BRIGHTNESS,
        }
    }
}

/// Conversion between a UI-local scale (e.g. 0-100) and the canonical scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiScale {
    /// Largest value on the UI scale.
    pub ui_max: u32,
    /// Canonical value that `ui_max` maps to.
    pub canonical_max: u32,
}

impl UiScale {
    /// Create a scale.
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidScale`] if either bound is zero.
    pub fn new(ui_max: u32, canonical_max: u32) -> Result<Self, ControllerError> {
        let scale = Self {
            ui_max,
            canonical_max,
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Check that neither bound is zero.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.ui_max == 0 || self.canonical_max == 0 {
            return Err(ControllerError::InvalidScale {
                ui_max: self.ui_max,
                canonical_max: self.canonical_max,
            });
        }
        Ok(())
    }

    /// Convert a UI value to canonical units, `round(x * canonical_max / ui_max)`.
    pub fn to_canonical(&self, ui_value: u32) -> i32 {
        (ui_value as f64 * self.canonical_max as f64 / self.ui_max as f64).round() as i32
    }

    /// Convert a canonical level to the UI scale, `round(level * ui_max / canonical_max)`.
    ///
    /// Levels below zero render as zero.
    pub fn to_ui(&self, level: BrightnessLevel) -> u32 {
        let level = level.get().max(0);
        (level as f64 * self.ui_max as f64 / self.canonical_max as f64).round() as u32
    }
}

impl Default for UiScale {
    fn default() -> Self {
        Self {
            ui_max: 100,
            canonical_max: MAX_BRIGHTNESS as u32,
        }
    }
}
