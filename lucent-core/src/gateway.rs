//! The settings store seam.

use crate::error::ControllerError;
use crate::level::BrightnessLevel;
use crate::modes::BrightnessMode;

/// Callback invoked whenever the stored level or mode changes.
///
/// Gateways call listeners without holding their own locks, so a listener
/// may call back into the gateway.
pub type ChangeListener = Box<dyn Fn() + Send + Sync>;

/// Identifies a registered [`ChangeListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Access to the platform's brightness settings.
///
/// This allows mock implementations in tests and one adapter per platform.
pub trait SettingsGateway: Send + Sync {
    /// Read the canonical level. Returns 0 when the store has no usable value.
    fn get_level(&self) -> BrightnessLevel;

    /// Read the canonical mode. Returns [`BrightnessMode::Manual`] when unavailable.
    fn get_mode(&self) -> BrightnessMode;

    /// Write the canonical level.
    ///
    /// # Errors
    /// [`ControllerError::PermissionDenied`] without write authority.
    fn set_level(&self, level: BrightnessLevel) -> Result<(), ControllerError>;

    /// Write the canonical mode.
    ///
    /// # Errors
    /// [`ControllerError::PermissionDenied`] without write authority.
    fn set_mode(&self, mode: BrightnessMode) -> Result<(), ControllerError>;

    /// Register a listener for level or mode changes.
    ///
    /// Changes made through this gateway are delivered too. Delivery may happen
    /// later and on another thread.
    fn subscribe(&self, listener: ChangeListener) -> Result<SubscriptionId, ControllerError>;

    /// Release a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Whether this process may currently write settings.
    fn has_write_authority(&self) -> bool;

    /// Start the out-of-band flow that lets the user grant write authority.
    ///
    /// The outcome is only observable by polling [`Self::has_write_authority`].
    fn request_write_authority(&self);
}
