//! Mock settings gateway for testing.

use std::sync::{Arc, Mutex};

use log::trace;

use crate::error::ControllerError;
use crate::gateway::{ChangeListener, SettingsGateway, SubscriptionId};
use crate::level::BrightnessLevel;
use crate::modes::BrightnessMode;

/// When the mock hands change notifications to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queue notifications until [`MockGateway::deliver_pending`] is called,
    /// like a store that notifies on a later turn of the event loop.
    Deferred,
    /// Invoke listeners inside the write that caused the change.
    Immediate,
}

/// An in-memory settings store.
///
/// This allows testing code that depends on [`SettingsGateway`] without a
/// real settings store. Tests can also simulate changes made by another
/// process and toggle write authority.
///
/// # Example
///
/// ```
/// use lucent_core::{BrightnessLevel, BrightnessMode, MockGateway, SettingsGateway};
///
/// let mock = MockGateway::new(120, BrightnessMode::Manual);
/// mock.set_level(BrightnessLevel::new(80)).unwrap();
/// assert_eq!(mock.get_level().get(), 80);
/// assert_eq!(mock.pending_notifications(), 1);
/// ```
pub struct MockGateway {
    state: Mutex<MockState>,
}

struct MockState {
    level: BrightnessLevel,
    mode: BrightnessMode,
    ambient_level: Option<BrightnessLevel>,
    authority: bool,
    rejects_writes: bool,
    authority_requests: usize,
    delivery: Delivery,
    pending: usize,
    listeners: Vec<(SubscriptionId, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
}

impl MockState {
    /// Record a change. Returns the listeners to call right away, if any.
    fn changed(&mut self) -> Vec<Arc<dyn Fn() + Send + Sync>> {
        match self.delivery {
            Delivery::Deferred => {
                self.pending += 1;
                Vec::new()
            }
            Delivery::Immediate => self.listeners(),
        }
    }

    fn listeners(&self) -> Vec<Arc<dyn Fn() + Send + Sync>> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn check_writable(&self) -> Result<(), ControllerError> {
        if self.authority && !self.rejects_writes {
            Ok(())
        } else {
            Err(ControllerError::PermissionDenied)
        }
    }

    fn apply_mode(&mut self, mode: BrightnessMode) {
        self.mode = mode;
        if let (BrightnessMode::Automatic, Some(ambient)) = (mode, self.ambient_level) {
            self.level = ambient;
        }
    }
}

impl MockGateway {
    /// Create a mock with write authority and deferred delivery.
    pub fn new(level: i32, mode: BrightnessMode) -> Self {
        Self {
            state: Mutex::new(MockState {
                level: BrightnessLevel::new(level),
                mode,
                ambient_level: None,
                authority: true,
                rejects_writes: false,
                authority_requests: 0,
                delivery: Delivery::Deferred,
                pending: 0,
                listeners: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Choose how notifications are delivered.
    pub fn with_delivery(self, delivery: Delivery) -> Self {
        self.state.lock().unwrap().delivery = delivery;
        self
    }

    /// Level the store reports whenever it is switched to automatic mode.
    pub fn with_ambient_level(self, level: i32) -> Self {
        self.state.lock().unwrap().ambient_level = Some(BrightnessLevel::new(level));
        self
    }

    /// Deliver every queued notification. Returns how many were delivered.
    pub fn deliver_pending(&self) -> usize {
        let (pending, listeners) = {
            let mut state = self.state.lock().unwrap();
            (std::mem::take(&mut state.pending), state.listeners())
        };

        for _ in 0..pending {
            notify(&listeners);
        }
        pending
    }

    /// Number of notifications waiting for [`Self::deliver_pending`].
    pub fn pending_notifications(&self) -> usize {
        self.state.lock().unwrap().pending
    }

    /// Change the level as another process would, bypassing authority.
    pub fn external_set_level(&self, level: i32) {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            state.level = BrightnessLevel::new(level);
            state.changed()
        };
        notify(&listeners);
    }

    /// Change the mode as another process would, bypassing authority.
    pub fn external_set_mode(&self, mode: BrightnessMode) {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            state.apply_mode(mode);
            state.changed()
        };
        notify(&listeners);
    }

    /// Let writes succeed.
    pub fn grant_write_authority(&self) {
        self.state.lock().unwrap().authority = true;
    }

    /// Make writes fail with [`ControllerError::PermissionDenied`].
    pub fn revoke_write_authority(&self) {
        self.state.lock().unwrap().authority = false;
    }

    /// Keep reporting write authority but refuse every write, like a store
    /// whose access check disagrees with the actual write.
    pub fn reject_writes(&self, rejects: bool) {
        self.state.lock().unwrap().rejects_writes = rejects;
    }

    /// How many times [`SettingsGateway::request_write_authority`] was called.
    pub fn authority_requests(&self) -> usize {
        self.state.lock().unwrap().authority_requests
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.state.lock().unwrap().listeners.len()
    }
}

fn notify(listeners: &[Arc<dyn Fn() + Send + Sync>]) {
    trace!("notifying {} listener(s)", listeners.len());
    for listener in listeners {
        listener();
    }
}

impl SettingsGateway for MockGateway {
    fn get_level(&self) -> BrightnessLevel {
        self.state.lock().unwrap().level
    }

    fn get_mode(&self) -> BrightnessMode {
        self.state.lock().unwrap().mode
    }

    fn set_level(&self, level: BrightnessLevel) -> Result<(), ControllerError> {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            state.check_writable()?;
            state.level = level;
            state.changed()
        };
        notify(&listeners);
        Ok(())
    }

    fn set_mode(&self, mode: BrightnessMode) -> Result<(), ControllerError> {
        let listeners = {
            let mut state = self.state.lock().unwrap();
            state.check_writable()?;
            state.apply_mode(mode);
            state.changed()
        };
        notify(&listeners);
        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) -> Result<SubscriptionId, ControllerError> {
        let mut state = self.state.lock().unwrap();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.listeners.push((id, Arc::from(listener)));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state
            .lock()
            .unwrap()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    fn has_write_authority(&self) -> bool {
        self.state.lock().unwrap().authority
    }

    fn request_write_authority(&self) {
        self.state.lock().unwrap().authority_requests += 1;
    }
}
