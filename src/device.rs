//! Device listener handles and the backends that open them.

use crate::error::Result;
use crate::eventbus::{KeyCallback, RootCallback};
use std::sync::Arc;

/// Reads raw key events from one input device and dispatches them.
///
/// A listener is configured with [`bind`](Self::bind) / [`set_root`](Self::set_root),
/// then driven by [`run`](Self::run) on a dedicated thread. `run` blocks until
/// [`close`](Self::close) is called from any other thread, or the device fails.
pub trait KeyListener: Send + Sync {
    /// Device identifier passed to root callbacks (the device path).
    fn id(&self) -> &str;

    fn bind(&self, keycode: u16, on_release: bool, callback: KeyCallback);

    fn set_root(&self, callback: RootCallback);

    fn run(&self) -> Result<()>;

    fn close(&self);
}

/// Source of input devices.
pub trait Backend: Send + Sync {
    /// Paths of every device calibration should listen to.
    fn enumerate(&self) -> Result<Vec<String>>;

    /// Open a listener for `path`. Failures map to `Error::DeviceOpen`.
    fn open(&self, path: &str) -> Result<Arc<dyn KeyListener>>;
}
