//! Settings store backed by a directory of plain-text values.
//!
//! The directory holds two files, [`LEVEL_FILE`] and [`MODE_FILE`], each
//! containing a single decimal integer, the same shape as a sysfs attribute.
//! Any process may edit them, and every edit (ours included) reaches
//! subscribers through a filesystem watcher.

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, info, trace, warn};
use nix::unistd::{AccessFlags, access};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tempfile::NamedTempFile;

use crate::config::SettingsConfig;
use crate::error::ControllerError;
use crate::gateway::{ChangeListener, SettingsGateway, SubscriptionId};
use crate::level::BrightnessLevel;
use crate::modes::BrightnessMode;

/// File holding the canonical brightness level.
pub const LEVEL_FILE: &str = "screen_brightness";
/// File holding the raw brightness mode (0 = manual, 1 = automatic).
pub const MODE_FILE: &str = "screen_brightness_mode";

/// Mode bits for settings files created by the first write.
const NEW_FILE_MODE: u32 = 0o644;

type SharedListener = Arc<dyn Fn() + Send + Sync>;
type Listeners = Arc<Mutex<Vec<(SubscriptionId, SharedListener)>>>;

/// A [`SettingsGateway`] over a settings directory.
pub struct FileSettingsGateway {
    dir: PathBuf,
    authority_helper: Option<Vec<String>>,
    listeners: Listeners,
    watcher: Mutex<Option<RecommendedWatcher>>,
    next_id: AtomicU64,
}

impl FileSettingsGateway {
    /// Use `dir` as the settings directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            authority_helper: None,
            listeners: Arc::default(),
            watcher: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Build a gateway from the `[settings]` configuration section.
    pub fn from_config(config: &SettingsConfig) -> Self {
        Self::new(&config.dir).with_authority_helper(config.authority_helper.clone())
    }

    /// Command spawned by [`SettingsGateway::request_write_authority`].
    pub fn with_authority_helper(mut self, helper: Option<Vec<String>>) -> Self {
        self.authority_helper = helper.filter(|argv| !argv.is_empty());
        self
    }

    /// The settings directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn read_value(&self, name: &str) -> Option<i32> {
        let path = self.dir.join(name);
        match fs::read_to_string(&path) {
            Ok(contents) => match contents.trim().parse() {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!("malformed value in {}: {}", path.display(), err);
                    None
                }
            },
            Err(err) => {
                debug!("can't read {}: {}", path.display(), err);
                None
            }
        }
    }

    fn write_value(&self, name: &str, value: i32) -> Result<(), ControllerError> {
        if !self.has_write_authority() {
            warn!("refusing to write {} without write authority", name);
            return Err(ControllerError::PermissionDenied);
        }

        let path = self.dir.join(name);
        replace_file(&self.dir, &path, value).map_err(ControllerError::from_write)?;
        debug!("wrote {} to {}", value, path.display());
        Ok(())
    }

    fn start_watcher(&self) -> Result<RecommendedWatcher, ControllerError> {
        let listeners = Arc::clone(&self.listeners);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_settings_change(&event) => {
                trace!("settings changed: {:?}", event.kind);
                // Listeners may call back into the gateway.
                let current: Vec<SharedListener> = listeners
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|(_, listener)| Arc::clone(listener))
                    .collect();
                for listener in current {
                    listener();
                }
            }
            Ok(_) => {}
            Err(err) => warn!("settings watcher error: {}", err),
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        info!("watching {}", self.dir.display());
        Ok(watcher)
    }
}

impl SettingsGateway for FileSettingsGateway {
    fn get_level(&self) -> BrightnessLevel {
        BrightnessLevel::new(self.read_value(LEVEL_FILE).unwrap_or(0))
    }

    fn get_mode(&self) -> BrightnessMode {
        self.read_value(MODE_FILE)
            .map(BrightnessMode::from_raw)
            .unwrap_or_default()
    }

    fn set_level(&self, level: BrightnessLevel) -> Result<(), ControllerError> {
        self.write_value(LEVEL_FILE, level.get())
    }

    fn set_mode(&self, mode: BrightnessMode) -> Result<(), ControllerError> {
        self.write_value(MODE_FILE, mode.as_raw())
    }

    fn subscribe(&self, listener: ChangeListener) -> Result<SubscriptionId, ControllerError> {
        let mut watcher = self.watcher.lock().unwrap();
        if watcher.is_none() {
            *watcher = Some(self.start_watcher()?);
        }

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().unwrap().push((id, Arc::from(listener)));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut watcher = self.watcher.lock().unwrap();

        let remaining = {
            let mut listeners = self.listeners.lock().unwrap();
            listeners.retain(|(listener_id, _)| *listener_id != id);
            listeners.len()
        };

        if remaining == 0 && watcher.take().is_some() {
            info!("stopped watching {}", self.dir.display());
        }
    }

    fn has_write_authority(&self) -> bool {
        let dir_writable = fs::metadata(&self.dir).is_ok_and(|meta| meta.is_dir())
            && is_writable(&self.dir);

        dir_writable
            && is_writable(&self.dir.join(LEVEL_FILE))
            && is_writable(&self.dir.join(MODE_FILE))
    }

    fn request_write_authority(&self) {
        let Some(argv) = &self.authority_helper else {
            warn!(
                "write access to {} is required, grant it and try again",
                self.dir.display()
            );
            return;
        };

        match Command::new(&argv[0]).args(&argv[1..]).spawn() {
            Ok(mut child) => {
                info!("started authority helper {} (pid {})", argv[0], child.id());
                // Reap in the background; the outcome is observed by polling.
                thread::spawn(move || {
                    if let Err(err) = child.wait() {
                        warn!("authority helper failed: {}", err);
                    }
                });
            }
            Err(err) => warn!("can't start authority helper {}: {}", argv[0], err),
        }
    }
}

/// Whether this process may write `path`.
///
/// A path with no write bit at all is locked even for root. Missing files
/// count as writable, they are created on first write.
fn is_writable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => {
            !meta.permissions().readonly() && access(path, AccessFlags::W_OK).is_ok()
        }
        Err(err) => err.kind() == io::ErrorKind::NotFound,
    }
}

/// Replace `path` in one step so readers never see a partial value.
///
/// The new file keeps the mode of the one it replaces.
fn replace_file(dir: &Path, path: &Path, value: i32) -> io::Result<()> {
    let mode = fs::metadata(path)
        .map(|meta| meta.permissions().mode())
        .unwrap_or(NEW_FILE_MODE);

    let mut file = NamedTempFile::new_in(dir)?;
    writeln!(file, "{value}")?;
    file.as_file()
        .set_permissions(fs::Permissions::from_mode(mode))?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn is_settings_change(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );

    relevant_kind
        && event.paths.iter().any(|path| {
            path.file_name()
                .is_some_and(|name| name == LEVEL_FILE || name == MODE_FILE)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn set_readonly(path: &Path, readonly: bool) {
        let mut permissions = fs::metadata(path).unwrap().permissions();
        permissions.set_readonly(readonly);
        fs::set_permissions(path, permissions).unwrap();
    }

    #[test]
    fn test_missing_values_use_defaults() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        assert_eq!(gateway.get_level().get(), 0);
        assert_eq!(gateway.get_mode(), BrightnessMode::Manual);
    }

    #[test]
    fn test_malformed_values_use_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEVEL_FILE), "bright\n").unwrap();
        fs::write(dir.path().join(MODE_FILE), "").unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        assert_eq!(gateway.get_level().get(), 0);
        assert_eq!(gateway.get_mode(), BrightnessMode::Manual);
    }

    #[test]
    fn test_reads_are_not_clamped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEVEL_FILE), "4095\n").unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        assert_eq!(gateway.get_level().get(), 4095);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        gateway.set_level(BrightnessLevel::new(128)).unwrap();
        gateway.set_mode(BrightnessMode::Automatic).unwrap();

        assert_eq!(gateway.get_level().get(), 128);
        assert_eq!(gateway.get_mode(), BrightnessMode::Automatic);
        assert_eq!(
            fs::read_to_string(dir.path().join(MODE_FILE)).unwrap(),
            "1\n"
        );
    }

    #[test]
    fn test_readonly_file_denies_writes() {
        let dir = TempDir::new().unwrap();
        let level_path = dir.path().join(LEVEL_FILE);
        fs::write(&level_path, "120\n").unwrap();
        set_readonly(&level_path, true);
        let gateway = FileSettingsGateway::new(dir.path());

        assert!(!gateway.has_write_authority());
        assert!(matches!(
            gateway.set_level(BrightnessLevel::new(200)),
            Err(ControllerError::PermissionDenied)
        ));
        assert!(gateway.set_mode(BrightnessMode::Automatic).is_err());
        assert_eq!(gateway.get_level().get(), 120);
        assert_eq!(gateway.get_mode(), BrightnessMode::Manual);
    }

    #[test]
    fn test_locked_dir_has_no_authority() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LEVEL_FILE), "120\n").unwrap();
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        let authority = gateway.has_write_authority();
        let denied = gateway.set_level(BrightnessLevel::new(200));
        fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).unwrap();

        assert!(!authority);
        assert!(matches!(denied, Err(ControllerError::PermissionDenied)));
        assert_eq!(gateway.get_level().get(), 120);
    }

    #[test]
    fn test_store_owned_by_another_user_has_no_authority() {
        // The mode bits of `/` allow writes, but only to its owner.
        if nix::unistd::geteuid().is_root() {
            return;
        }
        let gateway = FileSettingsGateway::new("/");

        assert!(!gateway.has_write_authority());
        assert!(matches!(
            gateway.set_level(BrightnessLevel::new(200)),
            Err(ControllerError::PermissionDenied)
        ));
    }

    #[test]
    fn test_write_keeps_file_mode() {
        let dir = TempDir::new().unwrap();
        let level_path = dir.path().join(LEVEL_FILE);
        fs::write(&level_path, "120\n").unwrap();
        fs::set_permissions(&level_path, fs::Permissions::from_mode(0o600)).unwrap();
        let gateway = FileSettingsGateway::new(dir.path());

        gateway.set_level(BrightnessLevel::new(64)).unwrap();
        gateway.set_mode(BrightnessMode::Automatic).unwrap();

        let mode = |name: &str| fs::metadata(dir.path().join(name)).unwrap().permissions().mode();
        assert_eq!(mode(LEVEL_FILE) & 0o777, 0o600);
        assert_eq!(mode(MODE_FILE) & 0o777, NEW_FILE_MODE);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_readers_never_see_partial_writes() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());
        gateway.set_level(BrightnessLevel::new(100)).unwrap();

        let reads = Arc::new(AtomicU64::new(0));
        let torn = Arc::new(AtomicU64::new(0));
        let level_path = dir.path().join(LEVEL_FILE);
        let (reads_seen, torn_seen) = (reads.clone(), torn.clone());
        gateway
            .subscribe(Box::new(move || {
                reads_seen.fetch_add(1, Ordering::SeqCst);
                let value = fs::read_to_string(&level_path)
                    .ok()
                    .and_then(|contents| contents.trim().parse::<i32>().ok());
                if !matches!(value, Some(100) | Some(200)) {
                    torn_seen.fetch_add(1, Ordering::SeqCst);
                }
            }))
            .unwrap();

        for i in 0..500 {
            let level = if i % 2 == 0 { 200 } else { 100 };
            gateway.set_level(BrightnessLevel::new(level)).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while reads.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        thread::sleep(Duration::from_millis(200));

        assert!(reads.load(Ordering::SeqCst) > 0);
        assert_eq!(torn.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_may_call_back_into_gateway() {
        let dir = TempDir::new().unwrap();
        let gateway = Arc::new(FileSettingsGateway::new(dir.path()));
        let (tx, rx) = mpsc::channel();

        let weak = Arc::downgrade(&gateway);
        gateway
            .subscribe(Box::new(move || {
                if let Some(gateway) = weak.upgrade() {
                    let _ = tx.send(gateway.listener_count());
                }
            }))
            .unwrap();

        gateway.set_level(BrightnessLevel::new(77)).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(1));
    }

    #[test]
    fn test_missing_dir_has_no_authority() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path().join("absent"));
        assert!(!gateway.has_write_authority());
    }

    #[test]
    fn test_self_notification_is_delivered() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());
        let (tx, rx) = mpsc::channel();
        gateway
            .subscribe(Box::new(move || {
                let _ = tx.send(());
            }))
            .unwrap();

        gateway.set_level(BrightnessLevel::new(77)).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());
        let (tx, rx) = mpsc::channel();
        gateway
            .subscribe(Box::new(move || {
                let _ = tx.send(());
            }))
            .unwrap();

        fs::write(dir.path().join("screen_off_timeout"), "30000\n").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_unsubscribe_releases_listener() {
        let dir = TempDir::new().unwrap();
        let gateway = FileSettingsGateway::new(dir.path());
        let id = gateway.subscribe(Box::new(|| {})).unwrap();
        assert_eq!(gateway.listener_count(), 1);

        gateway.unsubscribe(id);
        assert_eq!(gateway.listener_count(), 0);
        assert!(gateway.watcher.lock().unwrap().is_none());
    }

    #[test]
    fn test_authority_helper_grants_access() {
        let dir = TempDir::new().unwrap();
        let level_path = dir.path().join(LEVEL_FILE);
        fs::write(&level_path, "120\n").unwrap();
        set_readonly(&level_path, true);

        let helper = vec![
            "chmod".to_string(),
            "u+w".to_string(),
            level_path.display().to_string(),
        ];
        let gateway = FileSettingsGateway::new(dir.path()).with_authority_helper(Some(helper));
        assert!(!gateway.has_write_authority());

        gateway.request_write_authority();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !gateway.has_write_authority() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(gateway.has_write_authority());
    }
}
