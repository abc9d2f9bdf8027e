//! TOML configuration.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::level::{BrightnessRange, UiScale};

/// System-wide configuration directory.
pub const CONFIG_DIR: &str = "/etc/lucent";
/// Configuration file name inside a configuration directory.
pub const CONFIG_FILE: &str = "config.toml";
/// Default settings directory.
pub const DEFAULT_SETTINGS_DIR: &str = "/var/lib/lucent";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bounds applied to UI level requests.
    #[serde(default)]
    pub range: BrightnessRange,

    /// UI scale conversion.
    #[serde(default)]
    pub scale: UiScale,

    /// Settings store location.
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Where settings live and how write authority is requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Settings directory.
    pub dir: PathBuf,

    /// Command line spawned to let the user grant write access.
    pub authority_helper: Option<Vec<String>>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_SETTINGS_DIR),
            authority_helper: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the user file, then the system file, else defaults.
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(user_config) = user_config_path().filter(|path| path.exists()) {
            return Self::load(&user_config);
        }

        let system_config = Path::new(CONFIG_DIR).join(CONFIG_FILE);
        if system_config.exists() {
            return Self::load(&system_config);
        }

        warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check the range and scale.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.range.validate()?;
        self.scale.validate()?;
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/lucent/config.toml`, falling back to `~/.config`.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("lucent").join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.range.min, 10);
        assert_eq!(config.range.max, 255);
        assert_eq!(config.scale.ui_max, 100);
        assert_eq!(config.scale.canonical_max, 255);
        assert_eq!(config.settings.dir, PathBuf::from(DEFAULT_SETTINGS_DIR));
        assert!(config.settings.authority_helper.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[range]\nmin = 1\n\n[settings]\ndir = \"/tmp/lucent\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.range.min, 1);
        assert_eq!(config.range.max, 255);
        assert_eq!(config.scale, UiScale::default());
        assert_eq!(config.settings.dir, PathBuf::from("/tmp/lucent"));
    }

    #[test]
    fn test_authority_helper() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[settings]\nauthority_helper = [\"pkexec\", \"chmod\", \"a+w\", \"/var/lib/lucent\"]"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.settings.authority_helper.unwrap(),
            vec!["pkexec", "chmod", "a+w", "/var/lib/lucent"]
        );
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[range]\nmin = 200\nmax = 100").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid(ControllerError::InvalidRange { min: 200, max: 100 })
        ));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scale]\nui_max = 0").unwrap();

        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Invalid(ControllerError::InvalidScale { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[range\nmin = ").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let mut config = Config::default();
        config.range.min = 20;
        config.settings.authority_helper = Some(vec!["true".to_string()]);

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
