//! Runtime activation of a calibration map.

use crate::binding::BindingMap;
use crate::device::Backend;
use crate::error::Result;
use crate::manager::ListenerManager;
use crate::menu::Navigator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Connects calibrated keys to a [`Navigator`].
pub struct BindingActivator<'a> {
    backend: &'a dyn Backend,
    navigator: Arc<dyn Navigator>,
}

impl<'a> BindingActivator<'a> {
    pub fn new(backend: &'a dyn Backend, navigator: Arc<dyn Navigator>) -> Self {
        Self { backend, navigator }
    }

    /// Open every device in `map`, bind its keys, and start listening.
    ///
    /// All devices are opened before any listener starts, so a device that
    /// cannot be opened leaves nothing running.
    pub fn activate(&self, map: &BindingMap) -> Result<ActiveBindings> {
        let mut opened = Vec::with_capacity(map.len());
        for (device, bindings) in map.iter() {
            let listener = self.backend.open(device)?;
            for binding in bindings {
                let nav = self.navigator.clone();
                let action = binding.action;
                debug!(device, keycode = binding.keycode, %action, "binding key");
                listener.bind(
                    binding.keycode,
                    binding.fire_on_release,
                    Box::new(move || action.dispatch(nav.as_ref())),
                );
            }
            opened.push(listener);
        }

        let mut manager = ListenerManager::new();
        for listener in opened {
            manager.spawn(listener)?;
        }
        info!(devices = manager.len(), "key bindings active");
        Ok(ActiveBindings { manager })
    }

    /// Load `path` and activate it. Unknown action names fail here, before
    /// any device is opened.
    pub fn activate_file(&self, path: &Path) -> Result<ActiveBindings> {
        let map = BindingMap::load(path)?;
        self.activate(&map)
    }
}

/// Listeners started by [`BindingActivator::activate`].
///
/// Dropping this closes every listener.
pub struct ActiveBindings {
    manager: ListenerManager,
}

impl ActiveBindings {
    /// Device paths being listened to.
    pub fn devices(&self) -> Vec<String> {
        self.manager.devices()
    }

    /// Block until every listener has stopped.
    pub fn wait(mut self) {
        self.manager.join();
    }

    pub fn close(mut self) {
        self.manager.close_all();
    }
}

#[cfg(all(test, feature = "virtual"))]
mod tests {
    use super::*;
    use crate::backends::virtual_input::VirtualBackend;
    use crate::binding::KeyBinding;
    use crate::error::Error;
    use crate::event::KeyEdge;
    use crate::menu::MenuAction;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<MenuAction>>);

    impl Navigator for Recorder {
        fn previous_item(&self) {
            self.0.lock().unwrap().push(MenuAction::PreviousItem);
        }
        fn next_item(&self) {
            self.0.lock().unwrap().push(MenuAction::NextItem);
        }
        fn select_item(&self) {
            self.0.lock().unwrap().push(MenuAction::SelectItem);
        }
    }

    impl Recorder {
        fn wait_for(&self, n: usize) -> Vec<MenuAction> {
            let deadline = Instant::now() + Duration::from_secs(2);
            while Instant::now() < deadline {
                let seen = self.0.lock().unwrap().clone();
                if seen.len() >= n {
                    return seen;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            self.0.lock().unwrap().clone()
        }
    }

    fn map() -> BindingMap {
        let mut map = BindingMap::new();
        map.push("remote", KeyBinding::captured(114, MenuAction::NextItem));
        map.push("remote", KeyBinding::captured(115, MenuAction::PreviousItem));
        map.push(
            "pad",
            KeyBinding {
                keycode: 304,
                action: MenuAction::SelectItem,
                fire_on_release: false,
            },
        );
        map
    }

    #[test]
    fn keys_dispatch_to_bound_actions_on_their_edge() {
        let backend = VirtualBackend::new(["remote", "pad"]);
        let nav = Arc::new(Recorder::default());
        let active = BindingActivator::new(&backend, nav.clone())
            .activate(&map())
            .unwrap();
        assert_eq!(active.devices().len(), 2);

        // Press-only on a release binding does nothing; release fires.
        backend.press("remote", 114);
        backend.release("remote", 114);
        assert_eq!(nav.wait_for(1), vec![MenuAction::NextItem]);

        backend.press("pad", 304);
        assert_eq!(nav.wait_for(2), vec![MenuAction::NextItem, MenuAction::SelectItem]);

        backend.tap("remote", 1);
        backend.tap("remote", 115);
        assert_eq!(
            nav.wait_for(3),
            vec![MenuAction::NextItem, MenuAction::SelectItem, MenuAction::PreviousItem]
        );

        active.close();
        assert!(backend.listener("remote").unwrap().is_closed());
    }

    #[test]
    fn activating_twice_binds_the_same_keys() {
        let backend = VirtualBackend::new(["remote", "pad"]);
        let nav = Arc::new(Recorder::default());
        let activator = BindingActivator::new(&backend, nav);

        let first = activator.activate(&map()).unwrap();
        let remote_first = backend.listener("remote").unwrap().bindings();
        let pad_first = backend.listener("pad").unwrap().bindings();
        drop(first);

        let _second = activator.activate(&map()).unwrap();
        assert_eq!(backend.listener("remote").unwrap().bindings(), remote_first);
        assert_eq!(backend.listener("pad").unwrap().bindings(), pad_first);
        assert_eq!(
            remote_first,
            vec![(114, KeyEdge::Release), (115, KeyEdge::Release)]
        );
        assert_eq!(pad_first, vec![(304, KeyEdge::Press)]);
    }

    #[test]
    fn unopenable_device_starts_nothing() {
        let backend = VirtualBackend::new(["remote", "pad"]).with_broken("remote");
        let nav = Arc::new(Recorder::default());
        let err = BindingActivator::new(&backend, nav)
            .activate(&map())
            .err()
            .unwrap();
        match err {
            Error::DeviceOpen { path, .. } => assert_eq!(path, "remote"),
            other => panic!("expected DeviceOpen, got {other:?}"),
        }
    }
}
