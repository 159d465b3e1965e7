//! In-memory input devices.
//!
//! A [`VirtualListener`] is a [`KeyListener`] whose events come from the host
//! instead of hardware: call [`press`](VirtualListener::press),
//! [`release`](VirtualListener::release) or [`tap`](VirtualListener::tap) and
//! the listener's `run` loop delivers them in order. [`VirtualBackend`] hands
//! out such listeners for a fixed list of device paths.

use crate::device::{Backend, KeyListener};
use crate::error::{Error, Result};
use crate::event::{KeyEdge, KeyEvent};
use crate::eventbus::{KeyCallback, KeyEventBus, RootCallback};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

#[derive(Default)]
struct Queue {
    events: VecDeque<KeyEvent>,
    closed: bool,
}

struct Inner {
    id: String,
    bus: KeyEventBus,
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// Host-fed listener. Clones share the same device.
#[derive(Clone)]
pub struct VirtualListener {
    inner: Arc<Inner>,
}

impl VirtualListener {
    pub fn new(id: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.to_string(),
                bus: KeyEventBus::new(),
                queue: Mutex::new(Queue::default()),
                wake: Condvar::new(),
            }),
        }
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inject a raw event. Ignored once the listener is closed.
    pub fn feed(&self, event: KeyEvent) {
        let mut q = self.queue();
        if q.closed {
            return;
        }
        q.events.push_back(event);
        self.inner.wake.notify_all();
    }

    pub fn press(&self, keycode: u16) {
        self.feed(KeyEvent::press(keycode));
    }

    pub fn release(&self, keycode: u16) {
        self.feed(KeyEvent::release(keycode));
    }

    /// Press then release `keycode`.
    pub fn tap(&self, keycode: u16) {
        self.press(keycode);
        self.release(keycode);
    }

    /// Bound `(keycode, edge)` pairs.
    pub fn bindings(&self) -> Vec<(u16, KeyEdge)> {
        self.inner.bus.bindings()
    }

    pub fn is_closed(&self) -> bool {
        self.queue().closed
    }
}

impl KeyListener for VirtualListener {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn bind(&self, keycode: u16, on_release: bool, callback: KeyCallback) {
        self.inner.bus.bind(keycode, on_release, callback);
    }

    fn set_root(&self, callback: RootCallback) {
        self.inner.bus.set_root(callback);
    }

    fn run(&self) -> Result<()> {
        loop {
            let event = {
                let guard = self.queue();
                let mut q = self
                    .inner
                    .wake
                    .wait_while(guard, |q| q.events.is_empty() && !q.closed)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if q.closed {
                    return Ok(());
                }
                match q.events.pop_front() {
                    Some(event) => event,
                    None => continue,
                }
            };
            self.inner.bus.emit(&self.inner.id, event);
        }
    }

    fn close(&self) {
        let mut q = self.queue();
        q.closed = true;
        q.events.clear();
        self.inner.wake.notify_all();
    }
}

/// Backend serving [`VirtualListener`]s for a fixed set of device paths.
///
/// Each `open` creates a fresh listener; the most recent one per path is kept
/// so the host can feed it through [`tap`](Self::tap) and friends.
#[derive(Default)]
pub struct VirtualBackend {
    devices: Vec<String>,
    broken: HashSet<String>,
    opened: Mutex<HashMap<String, VirtualListener>>,
    open_count: Mutex<usize>,
}

impl VirtualBackend {
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Make every `open` of `path` fail, as if permission were denied.
    pub fn with_broken(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }

    /// Most recently opened listener for `path`.
    pub fn listener(&self, path: &str) -> Option<VirtualListener> {
        self.opened.lock().ok()?.get(path).cloned()
    }

    /// Total successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.open_count.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn press(&self, path: &str, keycode: u16) {
        if let Some(l) = self.listener(path) {
            l.press(keycode);
        }
    }

    pub fn release(&self, path: &str, keycode: u16) {
        if let Some(l) = self.listener(path) {
            l.release(keycode);
        }
    }

    pub fn tap(&self, path: &str, keycode: u16) {
        if let Some(l) = self.listener(path) {
            l.tap(keycode);
        }
    }
}

impl Backend for VirtualBackend {
    fn enumerate(&self) -> Result<Vec<String>> {
        Ok(self.devices.clone())
    }

    fn open(&self, path: &str) -> Result<Arc<dyn KeyListener>> {
        if self.broken.contains(path) || !self.devices.iter().any(|d| d == path) {
            return Err(Error::DeviceOpen {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such virtual device"),
            });
        }
        let listener = VirtualListener::new(path);
        if let Ok(mut opened) = self.opened.lock() {
            opened.insert(path.to_string(), listener.clone());
        }
        if let Ok(mut n) = self.open_count.lock() {
            *n += 1;
        }
        Ok(Arc::new(listener))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn run_delivers_fed_events_in_order_until_closed() {
        let listener = VirtualListener::new("virtual:0");
        let (tx, rx) = mpsc::channel();
        listener.set_root(Arc::new(move |dev: &str, code: u16, rel: bool| {
            tx.send((dev.to_string(), code, rel)).unwrap();
        }));

        let worker = listener.clone();
        let handle = thread::spawn(move || worker.run());

        listener.tap(30);
        listener.press(31);
        let got: Vec<_> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(
            got,
            vec![
                ("virtual:0".to_string(), 30, false),
                ("virtual:0".to_string(), 30, true),
                ("virtual:0".to_string(), 31, false),
            ]
        );

        listener.close();
        handle.join().unwrap().unwrap();
        assert!(listener.is_closed());
    }

    #[test]
    fn backend_rejects_unknown_and_broken_paths() {
        let backend = VirtualBackend::new(["a", "b"]).with_broken("b");
        assert!(backend.open("a").is_ok());
        assert!(matches!(backend.open("b"), Err(Error::DeviceOpen { .. })));
        assert!(matches!(backend.open("c"), Err(Error::DeviceOpen { .. })));
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.enumerate().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
