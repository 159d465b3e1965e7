//! Raw event logging for diagnosing devices and keycodes.
use crate::device::Backend;
use crate::error::Result;
use crate::eventbus::RootCallback;
use crate::manager::ListenerManager;
use std::sync::Arc;
use tracing::info;

/// Root callback that logs every key event at `info` level.
pub struct Logger;

impl Logger {
    pub fn callback() -> RootCallback {
        Arc::new(|device: &str, keycode: u16, is_release: bool| {
            let edge = if is_release { "release" } else { "press" };
            info!(device, keycode, edge, "key");
        })
    }

    /// Listen to every device `backend` enumerates and log its events.
    pub fn attach(backend: &dyn Backend) -> Result<ListenerManager> {
        let mut manager = ListenerManager::new();
        for path in backend.enumerate()? {
            let listener = backend.open(&path)?;
            listener.set_root(Self::callback());
            manager.spawn(listener)?;
        }
        Ok(manager)
    }
}
