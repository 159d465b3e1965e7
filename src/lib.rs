//! menubind: map keyboards, remotes and controllers onto menu navigation.
//!
//! The [`Wizard`] captures one key per [`MenuAction`] from whatever input devices
//! are connected and saves the result as a calibration file. At runtime the
//! [`BindingActivator`] loads that file and drives a host-provided
//! [`Navigator`].
//!
//! ```no_run
//! # #[cfg(all(feature = "evdev", target_os = "linux"))]
//! # fn main() -> menubind::Result<()> {
//! use menubind::backends::evdev::EvdevBackend;
//! use menubind::{Calibration, TerminalStatus, Wizard};
//!
//! let backend = EvdevBackend::default();
//! let mut screen = TerminalStatus;
//! match Wizard::new(&backend, &mut screen).calibrate(None)? {
//!     Calibration::Cancelled => println!("cancelled"),
//!     _ => println!("saved"),
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "evdev", target_os = "linux")))]
//! # fn main() {}
//! ```

pub mod activator;
pub mod backends;
pub mod binding;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod gate;
pub mod logger;
pub mod manager;
pub mod menu;
pub mod wizard;

pub use activator::{ActiveBindings, BindingActivator};
pub use binding::{BindingMap, KeyBinding, DEFAULT_CALIBRATION_FILE};
pub use config::{Config, Timings};
pub use device::{Backend, KeyListener};
pub use error::{Error, Result};
pub use event::{KeyEdge, KeyEvent};
pub use gate::{CaptureGate, Pending, Wait};
pub use manager::ListenerManager;
pub use menu::{MenuAction, Navigator, StatusDisplay, TerminalStatus};
pub use wizard::{Calibration, Wizard};
