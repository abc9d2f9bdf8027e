//! Error types for the brightness controller.

use std::path::PathBuf;

/// Errors that can occur when driving brightness settings.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A write was attempted without write authority.
    ///
    /// The user must grant authority and retry the action; nothing is queued.
    #[error("Permission denied - write access to brightness settings is required")]
    PermissionDenied,

    /// An I/O error occurred while accessing the settings store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The filesystem watcher backing change notifications failed.
    #[error("Failed to watch settings: {0}")]
    Watch(#[from] notify::Error),

    /// A brightness range with `min > max` was supplied.
    #[error("Invalid brightness range {min}-{max}")]
    InvalidRange {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },

    /// A UI scale with a zero bound was supplied.
    #[error("Invalid UI scale (ui max {ui_max}, canonical max {canonical_max})")]
    InvalidScale {
        /// Largest value on the UI scale.
        ui_max: u32,
        /// Largest value on the canonical scale.
        canonical_max: u32,
    },
}

impl ControllerError {
    /// Map an I/O error, turning permission failures into [`ControllerError::PermissionDenied`].
    pub(crate) fn from_write(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::ReadOnlyFilesystem => {
                Self::PermissionDenied
            }
            _ => Self::Io(err),
        }
    }
}

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration parsed but holds unusable values.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ControllerError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`Config`](crate::Config).
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
