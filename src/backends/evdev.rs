#![cfg(all(feature = "evdev", target_os = "linux"))]

//! Linux evdev backend.
//!
//! Reads `EV_KEY` events from `/dev/input/eventN` nodes. The node is switched to
//! non-blocking mode on open and polled on a short interval, so
//! [`close`](crate::device::KeyListener::close) takes effect within one poll
//! period without needing to interrupt a blocked read.
//!
//! Devices are not grabbed: the rest of the system keeps seeing the keys.
//! Reading event nodes usually requires membership in the `input` group.

use crate::backends::{probe_devices, INPUT_ROOT};
use crate::device::{Backend, KeyListener};
use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::eventbus::{KeyCallback, KeyEventBus, RootCallback};
use evdev::{Device, InputEventKind};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Sleep between reads of an idle node unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// EV_KEY values
const KEY_RELEASE: i32 = 0;
const KEY_PRESS: i32 = 1;

/// Listener over one evdev node.
pub struct EvdevListener {
    path: String,
    device: Mutex<Device>,
    bus: KeyEventBus,
    closed: AtomicBool,
    poll_interval: Duration,
}

impl EvdevListener {
    pub fn open(path: &str, poll_interval: Duration) -> Result<Self> {
        let open_err = |source| Error::DeviceOpen {
            path: path.to_string(),
            source,
        };
        let device = Device::open(path).map_err(open_err)?;
        set_nonblocking(&device).map_err(open_err)?;
        debug!(
            device = path,
            name = device.name().unwrap_or("unknown"),
            "opened input device"
        );
        Ok(Self {
            path: path.to_string(),
            device: Mutex::new(device),
            bus: KeyEventBus::new(),
            closed: AtomicBool::new(false),
            poll_interval,
        })
    }

    /// Drain whatever key events are pending without blocking.
    fn fetch_keys(&self) -> Result<Vec<KeyEvent>> {
        let mut device = self
            .device
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut keys = Vec::new();
        match device.fetch_events() {
            Ok(events) => {
                for ev in events {
                    if let InputEventKind::Key(key) = ev.kind() {
                        match ev.value() {
                            KEY_PRESS => keys.push(KeyEvent::press(key.code())),
                            KEY_RELEASE => keys.push(KeyEvent::release(key.code())),
                            _ => {} // autorepeat
                        }
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(source) => {
                return Err(Error::Listener {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        Ok(keys)
    }
}

impl KeyListener for EvdevListener {
    fn id(&self) -> &str {
        &self.path
    }

    fn bind(&self, keycode: u16, on_release: bool, callback: KeyCallback) {
        self.bus.bind(keycode, on_release, callback);
    }

    fn set_root(&self, callback: RootCallback) {
        self.bus.set_root(callback);
    }

    fn run(&self) -> Result<()> {
        while !self.closed.load(Ordering::Acquire) {
            let keys = self.fetch_keys()?;
            if keys.is_empty() {
                thread::sleep(self.poll_interval);
                continue;
            }
            for key in keys {
                self.bus.emit(&self.path, key);
            }
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Backend over the event nodes of an input directory.
#[derive(Debug, Clone)]
pub struct EvdevBackend {
    root: PathBuf,
    poll_interval: Duration,
}

impl EvdevBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Idle sleep for every listener opened after this call.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for EvdevBackend {
    fn default() -> Self {
        Self::new(INPUT_ROOT)
    }
}

impl Backend for EvdevBackend {
    fn enumerate(&self) -> Result<Vec<String>> {
        Ok(probe_devices(&self.root)?
            .map(|p| p.to_string_lossy().into_owned())
            .collect())
    }

    fn open(&self, path: &str) -> Result<Arc<dyn KeyListener>> {
        Ok(Arc::new(EvdevListener::open(path, self.poll_interval)?))
    }
}

/// Driver-reported name of the device at `path`, if it can be opened.
pub fn device_name(path: &Path) -> Option<String> {
    Device::open(path).ok()?.name().map(str::to_string)
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_carries_configured_poll_interval() {
        let backend = EvdevBackend::default();
        assert_eq!(backend.poll_interval(), DEFAULT_POLL_INTERVAL);

        let backend = EvdevBackend::new("/dev/input").with_poll_interval(Duration::from_millis(50));
        assert_eq!(backend.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn default_poll_interval_matches_config_default() {
        let timings = crate::config::Timings::default();
        assert_eq!(timings.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn opening_a_missing_node_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event0");
        let path = path.to_string_lossy().into_owned();
        match EvdevBackend::new(dir.path()).open(&path) {
            Err(Error::DeviceOpen { path: p, .. }) => assert_eq!(p, path),
            Err(other) => panic!("expected DeviceOpen, got {other:?}"),
            Ok(_) => panic!("missing node should not open"),
        }
    }
}
