//! Brightness session controller.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::ControllerError;
use crate::gateway::{SettingsGateway, SubscriptionId};
use crate::level::{BrightnessRange, UiScale};
use crate::modes::BrightnessMode;
use crate::state::{DisplayState, SessionSnapshot};

/// Where the controller is in the permission flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready to forward intents.
    Idle,
    /// A write was refused and the user was asked to grant write authority.
    AwaitingPermission,
}

/// Keeps the slider, the auto switch and the stored settings consistent.
///
/// Intents are forwarded to the gateway but never applied to the display
/// directly. The display only moves when a change notification arrives and
/// the canonical values are read back, so it always shows what the store
/// accepted, whoever made the change.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lucent_core::{BrightnessController, BrightnessMode, MockGateway};
///
/// let gateway = Arc::new(MockGateway::new(120, BrightnessMode::Manual));
/// let mut controller = BrightnessController::start(gateway.clone())?;
///
/// controller.set_level_from_ui(50)?;
/// assert_eq!(controller.display().level.get(), 120);
///
/// gateway.deliver_pending();
/// controller.process_notifications();
/// assert_eq!(controller.display().level.get(), 128);
/// # Ok::<(), lucent_core::ControllerError>(())
/// ```
pub struct BrightnessController<G: SettingsGateway + ?Sized> {
    gateway: Arc<G>,
    range: BrightnessRange,
    scale: UiScale,
    snapshot: SessionSnapshot,
    display: DisplayState,
    state: SessionState,
    notifications: Receiver<()>,
    subscription: Option<SubscriptionId>,
}

impl<G: SettingsGateway + ?Sized> BrightnessController<G> {
    /// Open a session with the default range and UI scale.
    pub fn start(gateway: Arc<G>) -> Result<Self, ControllerError> {
        Self::with_limits(gateway, BrightnessRange::default(), UiScale::default())
    }

    /// Open a session.
    ///
    /// Captures the session snapshot, mirrors it into the display and
    /// subscribes to change notifications.
    ///
    /// # Errors
    /// Fails if the range or scale is invalid or the gateway cannot subscribe.
    pub fn with_limits(
        gateway: Arc<G>,
        range: BrightnessRange,
        scale: UiScale,
    ) -> Result<Self, ControllerError> {
        range.validate()?;
        scale.validate()?;

        let snapshot = SessionSnapshot::new(gateway.get_level(), gateway.get_mode());

        let (tx, notifications) = mpsc::channel();
        let subscription = gateway.subscribe(Box::new(move || {
            let _ = tx.send(());
        }))?;

        info!(
            "session started: level={}, mode={}",
            snapshot.level(),
            snapshot.mode()
        );

        Ok(Self {
            gateway,
            range,
            scale,
            snapshot,
            display: snapshot.into(),
            state: SessionState::Idle,
            notifications,
            subscription: Some(subscription),
        })
    }

    /// Settings captured at session start.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot
    }

    /// What the UI should currently render.
    pub fn display(&self) -> DisplayState {
        self.display
    }

    /// Current permission state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Bounds applied to level requests.
    pub fn range(&self) -> BrightnessRange {
        self.range
    }

    /// UI scale used by [`Self::set_level_from_ui`].
    pub fn scale(&self) -> UiScale {
        self.scale
    }

    /// The gateway this session talks to.
    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// The user dragged the slider to `level`, in canonical units.
    ///
    /// Switches to manual mode and writes the clamped level.
    ///
    /// # Errors
    /// [`ControllerError::PermissionDenied`] if the process may not write
    /// settings. Authority is requested and nothing is written.
    pub fn set_level(&mut self, level: i32) -> Result<(), ControllerError> {
        self.ensure_write_authority()?;

        let level = self.range.clamp(level);
        debug!("set level: {}", level);
        let result = self
            .gateway
            .set_mode(BrightnessMode::Manual)
            .and_then(|()| self.gateway.set_level(level));
        self.check_write(result)
    }

    /// The user dragged the slider to `ui_value` on the UI scale.
    pub fn set_level_from_ui(&mut self, ui_value: u32) -> Result<(), ControllerError> {
        self.set_level(self.scale.to_canonical(ui_value))
    }

    /// The user flipped the auto-brightness switch.
    pub fn set_automatic(&mut self, enabled: bool) -> Result<(), ControllerError> {
        self.ensure_write_authority()?;

        let mode = BrightnessMode::from_switch(enabled);
        debug!("set mode: {}", mode);
        let result = self.gateway.set_mode(mode);
        self.check_write(result)
    }

    /// The user pressed revert.
    ///
    /// Restores the snapshot mode. The snapshot level is only restored for a
    /// manual snapshot, automatic mode picks its own level.
    pub fn revert(&mut self) -> Result<(), ControllerError> {
        self.ensure_write_authority()?;

        info!(
            "reverting to level={}, mode={}",
            self.snapshot.level(),
            self.snapshot.mode()
        );
        let result = match self.snapshot.mode() {
            BrightnessMode::Automatic => self.gateway.set_mode(BrightnessMode::Automatic),
            BrightnessMode::Manual => self
                .gateway
                .set_mode(BrightnessMode::Manual)
                .and_then(|()| self.gateway.set_level(self.snapshot.level())),
        };
        self.check_write(result)
    }

    /// Handle every queued change notification without blocking.
    ///
    /// Returns the new display state if at least one notification was pending.
    pub fn process_notifications(&mut self) -> Option<DisplayState> {
        let mut pending = 0usize;
        while self.notifications.try_recv().is_ok() {
            pending += 1;
        }

        if pending == 0 {
            return None;
        }

        debug!("processing {} change notification(s)", pending);
        Some(self.handle_change())
    }

    /// Block until a change notification arrives or `timeout` elapses.
    ///
    /// Notifications queued behind the first one are folded into the same
    /// re-read.
    pub fn wait_for_change(&mut self, timeout: Duration) -> Option<DisplayState> {
        match self.notifications.recv_timeout(timeout) {
            Ok(()) => {
                while self.notifications.try_recv().is_ok() {}
                Some(self.handle_change())
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Re-read the canonical settings into the display.
    pub fn handle_change(&mut self) -> DisplayState {
        self.display = DisplayState {
            level: self.gateway.get_level(),
            mode: self.gateway.get_mode(),
        };
        self.state = SessionState::Idle;

        debug!(
            "display updated: level={}, mode={}",
            self.display.level, self.display.mode
        );
        self.display
    }

    /// Close the session and release the change subscription.
    pub fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.gateway.unsubscribe(id);
            info!("session ended");
        }
    }

    fn ensure_write_authority(&mut self) -> Result<(), ControllerError> {
        if self.gateway.has_write_authority() {
            self.state = SessionState::Idle;
            return Ok(());
        }

        warn!("no write authority, requesting it");
        Err(self.await_permission())
    }

    /// A store may refuse a write its access check allowed.
    fn check_write(&mut self, result: Result<(), ControllerError>) -> Result<(), ControllerError> {
        match result {
            Err(ControllerError::PermissionDenied) => {
                warn!("settings store refused the write, requesting authority");
                Err(self.await_permission())
            }
            other => other,
        }
    }

    fn await_permission(&mut self) -> ControllerError {
        self.state = SessionState::AwaitingPermission;
        self.gateway.request_write_authority();
        ControllerError::PermissionDenied
    }
}

impl<G: SettingsGateway + ?Sized> Drop for BrightnessController<G> {
    fn drop(&mut self) {
        self.release();
    }
}
