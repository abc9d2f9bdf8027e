//! Screen brightness session control.
//!
//! A [`BrightnessController`] lets a UI show and adjust the screen brightness
//! level and auto-brightness mode, and revert both to the values that were
//! active when the session opened. It talks to the platform through the
//! [`SettingsGateway`] trait and only ever displays values the store has
//! confirmed through a change notification.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lucent_core::{BrightnessController, Config, FileSettingsGateway};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default()?;
//!     let gateway = Arc::new(FileSettingsGateway::from_config(&config.settings));
//!     let mut controller =
//!         BrightnessController::with_limits(gateway, config.range, config.scale)?;
//!
//!     // Drag the slider to 75%
//!     controller.set_level_from_ui(75)?;
//!
//!     // Render once the store confirms the change
//!     if let Some(display) = controller.wait_for_change(Duration::from_secs(1)) {
//!         println!("brightness {} ({})", display.level, display.mode);
//!     }
//!
//!     // Put everything back the way it was
//!     controller.revert()?;
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockGateway`] to drive a controller without a settings store:
//!
//! ```
//! use std::sync::Arc;
//! use lucent_core::{BrightnessController, BrightnessMode, MockGateway};
//!
//! let gateway = Arc::new(MockGateway::new(120, BrightnessMode::Manual));
//! let mut controller = BrightnessController::start(gateway.clone()).unwrap();
//! controller.set_automatic(true).unwrap();
//! gateway.deliver_pending();
//! assert!(controller.process_notifications().unwrap().is_automatic());
//! ```

#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod gateway;
mod level;
mod mock;
mod modes;
mod settings;
mod state;

// Re-export public API
pub use config::{
    CONFIG_DIR, CONFIG_FILE, Config, DEFAULT_SETTINGS_DIR, SettingsConfig, user_config_path,
};
pub use controller::{BrightnessController, SessionState};
pub use error::{ConfigError, ControllerError};
pub use gateway::{ChangeListener, SettingsGateway, SubscriptionId};
pub use level::{BrightnessLevel, BrightnessRange, MAX_BRIGHTNESS, MIN_BRIGHTNESS, UiScale};
pub use mock::{Delivery, MockGateway};
pub use modes::BrightnessMode;
pub use settings::{FileSettingsGateway, LEVEL_FILE, MODE_FILE};
pub use state::{DisplayState, SessionSnapshot};
