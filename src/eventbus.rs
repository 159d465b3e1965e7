//! Per-listener dispatch of raw key events.
//!
//! Every [`KeyListener`](crate::device::KeyListener) owns one [`KeyEventBus`].
//! The bus holds at most one callback per `(keycode, edge)` pair plus an
//! optional root callback that sees every event regardless of bindings.
//! Calibration installs only a root callback; runtime activation installs only
//! bound callbacks.

use crate::event::{KeyEdge, KeyEvent};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Callback bound to one `(keycode, edge)` pair.
pub type KeyCallback = Box<dyn Fn() + Send + Sync>;

/// Callback receiving every raw event: `(device id, keycode, is_release)`.
pub type RootCallback = Arc<dyn Fn(&str, u16, bool) + Send + Sync>;

type BoundMap = HashMap<(u16, KeyEdge), KeyCallback>;

#[derive(Default)]
pub struct KeyEventBus {
    bound: RwLock<BoundMap>,
    root: RwLock<Option<RootCallback>>,
}

impl KeyEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `keycode` on the given edge, replacing any previous
    /// callback for that pair.
    pub fn bind(&self, keycode: u16, on_release: bool, callback: KeyCallback) {
        let key = (keycode, KeyEdge::from_release(on_release));
        self.bound_mut().insert(key, callback);
    }

    pub fn set_root(&self, callback: RootCallback) {
        *self.root_mut() = Some(callback);
    }

    pub fn clear_root(&self) {
        *self.root_mut() = None;
    }

    /// Currently bound `(keycode, edge)` pairs, sorted.
    pub fn bindings(&self) -> Vec<(u16, KeyEdge)> {
        let mut keys: Vec<_> = self.bound().keys().copied().collect();
        keys.sort_by_key(|(code, edge)| (*code, edge.is_release()));
        keys
    }

    /// Deliver one event: root callback first, then the bound callback.
    pub fn emit(&self, device_id: &str, event: KeyEvent) {
        let root = self.root.read().unwrap_or_else(|p| p.into_inner()).clone();
        if let Some(root) = root {
            root(device_id, event.keycode, event.edge.is_release());
        }

        if let Some(callback) = self.bound().get(&(event.keycode, event.edge)) {
            callback();
        }
    }

    // Poisoning only means a writer panicked; the map itself stays usable.
    fn bound(&self) -> RwLockReadGuard<'_, BoundMap> {
        self.bound.read().unwrap_or_else(|p| p.into_inner())
    }

    fn bound_mut(&self) -> RwLockWriteGuard<'_, BoundMap> {
        self.bound.write().unwrap_or_else(|p| p.into_inner())
    }

    fn root_mut(&self) -> RwLockWriteGuard<'_, Option<RootCallback>> {
        self.root.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn bound_callback_fires_only_on_its_edge() {
        let bus = KeyEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        bus.bind(114, true, Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit("dev", KeyEvent::press(114));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.emit("dev", KeyEvent::release(114));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        bus.emit("dev", KeyEvent::release(115));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn root_sees_every_event() {
        let bus = KeyEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        bus.set_root(Arc::new(move |dev: &str, code: u16, rel: bool| {
            s.lock().unwrap().push((dev.to_string(), code, rel));
        }));

        bus.emit("a", KeyEvent::press(1));
        bus.emit("a", KeyEvent::release(1));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a".to_string(), 1, false), ("a".to_string(), 1, true)]
        );

        bus.clear_root();
        bus.emit("a", KeyEvent::press(2));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn rebinding_replaces_previous_callback() {
        let bus = KeyEventBus::new();
        bus.bind(5, true, Box::new(|| {}));
        bus.bind(5, true, Box::new(|| {}));
        bus.bind(5, false, Box::new(|| {}));
        assert_eq!(bus.bindings(), vec![(5, KeyEdge::Press), (5, KeyEdge::Release)]);
    }

    #[test]
    fn poisoned_bus_keeps_accepting_bindings() {
        let bus = Arc::new(KeyEventBus::new());
        bus.bind(7, false, Box::new(|| {}));

        let b = bus.clone();
        let worker = std::thread::spawn(move || {
            let _bound = b.bound.write().unwrap();
            let _root = b.root.write().unwrap();
            panic!("writer failed");
        });
        assert!(worker.join().is_err());
        assert!(bus.bound.is_poisoned());
        assert!(bus.root.is_poisoned());

        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        bus.bind(8, false, Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        let roots = Arc::new(AtomicUsize::new(0));
        let r = roots.clone();
        bus.set_root(Arc::new(move |_: &str, _: u16, _: bool| {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(bus.bindings(), vec![(7, KeyEdge::Press), (8, KeyEdge::Press)]);

        bus.emit("dev", KeyEvent::press(8));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(roots.load(Ordering::SeqCst), 1);
    }
}
