//! Input backends for `menubind`.
//!
//! Implementations of [`Backend`](crate::device::Backend) and
//! [`KeyListener`](crate::device::KeyListener) for concrete input sources.
//!
//! # Feature flags
//! - **`evdev`**: Linux `/dev/input/eventN` devices (default).
//! - **`virtual`**: in-memory devices fed by the host, used by tests and demos
//!   (default).

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[cfg(all(feature = "evdev", target_os = "linux"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "evdev", target_os = "linux"))))]
pub mod evdev;

#[cfg(feature = "virtual")]
pub mod virtual_input;

/// Default directory holding input event nodes.
pub const INPUT_ROOT: &str = "/dev/input";

/// Enumerate input event nodes directly under `root`.
///
/// Yields paths whose file name is `event` followed by decimal digits, in
/// directory order. Each call re-reads the directory. An empty directory gives
/// an empty iterator; only an unreadable `root` is an error.
pub fn probe_devices(root: &Path) -> Result<impl Iterator<Item = PathBuf>> {
    let entries = fs::read_dir(root).map_err(|source| Error::Enumerate {
        root: root.to_path_buf(),
        source,
    })?;

    Ok(entries.filter_map(|entry| match entry {
        Ok(entry) => is_event_node(&entry.file_name()).then(|| entry.path()),
        Err(e) => {
            warn!("skipping unreadable input entry: {e}");
            None
        }
    }))
}

fn is_event_node(name: &OsStr) -> bool {
    name.to_str()
        .and_then(|n| n.strip_prefix("event"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
