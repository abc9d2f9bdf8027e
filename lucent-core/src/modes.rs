//! Brightness mode definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the platform chooses the screen brightness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrightnessMode {
    /// The stored level is applied as-is.
    #[default]
    Manual,
    /// The platform picks the level itself; a fixed level is ignored.
    Automatic,
}

impl BrightnessMode {
    /// Raw settings value for manual mode.
    pub const RAW_MANUAL: i32 = 0;
    /// Raw settings value for automatic mode.
    pub const RAW_AUTOMATIC: i32 = 1;

    /// Decode a raw settings value.
    ///
    /// Only [`Self::RAW_AUTOMATIC`] means automatic, anything else reads as manual.
    pub fn from_raw(raw: i32) -> Self {
        if raw == Self::RAW_AUTOMATIC {
            Self::Automatic
        } else {
            Self::Manual
        }
    }

    /// Encode as a raw settings value.
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Manual => Self::RAW_MANUAL,
            Self::Automatic => Self::RAW_AUTOMATIC,
        }
    }

    /// Mode selected by an auto-brightness switch.
    pub fn from_switch(checked: bool) -> Self {
        if checked { Self::Automatic } else { Self::Manual }
    }

    /// Whether an auto-brightness switch renders checked for this mode.
    pub fn is_automatic(self) -> bool {
        self == Self::Automatic
    }
}

impl fmt::Display for BrightnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Automatic => f.write_str("automatic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_encoding() {
        assert_eq!(BrightnessMode::from_raw(0), BrightnessMode::Manual);
        assert_eq!(BrightnessMode::from_raw(1), BrightnessMode::Automatic);
        assert_eq!(BrightnessMode::Automatic.as_raw(), 1);
        assert_eq!(BrightnessMode::Manual.as_raw(), 0);
    }

    #[test]
    fn test_unknown_raw_value_is_manual() {
        assert_eq!(BrightnessMode::from_raw(-1), BrightnessMode::Manual);
        assert_eq!(BrightnessMode::from_raw(7), BrightnessMode::Manual);
    }

    #[test]
    fn test_switch_mapping() {
        assert!(BrightnessMode::from_switch(true).is_automatic());
        assert!(!BrightnessMode::from_switch(false).is_automatic());
    }
}
