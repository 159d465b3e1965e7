//! Interactive calibration.
//!
//! The wizard listens to every device the backend enumerates and walks the
//! operator through a fixed sequence:
//!
//! 0. **Resume check**: if a valid calibration file exists, any key within the
//!    resume window starts a recalibration; otherwise the file is kept.
//! 1. **Intro**: a short, timed introduction. Any key here cancels the run.
//! 2. Capture the *next item* key.
//! 3. Capture the *previous item* key.
//! 4. Capture the *select* key.
//! 5. **Persist** the captured map.
//!
//! Each capture stage records the first key pressed on any device. With several
//! devices connected only the fastest one gets a binding for that action.
//!
//! All listeners opened for the run are closed before [`Wizard::calibrate`]
//! returns, whatever the outcome.

use crate::binding::{BindingMap, DEFAULT_CALIBRATION_FILE};
use crate::config::Timings;
use crate::device::Backend;
use crate::error::{Error, Result};
use crate::gate::{CaptureGate, Pending, Wait};
use crate::manager::ListenerManager;
use crate::menu::{MenuAction, StatusDisplay};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a calibration run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Calibration {
    /// New bindings were captured and saved.
    Calibrated(BindingMap),
    /// The existing file was kept (and re-saved as-is).
    Unchanged(BindingMap),
    /// The operator pressed a key while the wizard was not capturing. Nothing
    /// was written.
    Cancelled,
}

enum Resume {
    Keep(BindingMap),
    Recalibrate,
    Cancelled,
}

const INTRO: [&[&str]; 3] = [
    &["Welcome to the calibrator!", "Press any key to cancel."],
    &[
        "Controllers and remotes\nare also supported.",
        "This is a guided process.",
    ],
    &["Get ready!"],
];

fn capture_prompt(action: MenuAction) -> (&'static str, &'static str) {
    match action {
        MenuAction::NextItem => (
            "Press any key to use to\nnavigate down in a menu.",
            "Recommended: volume down",
        ),
        MenuAction::PreviousItem => (
            "Press any key to use to\nnavigate up in a menu.",
            "Recommended: volume up",
        ),
        MenuAction::SelectItem => (
            "Press any key to use to\nselect a menu item.",
            "Recommended: touch screen",
        ),
    }
}

/// Resume window as shown to the operator. Whole seconds, rounded up, except
/// below one second.
fn window_text(window: Duration) -> String {
    let ms = window.as_millis();
    if ms < 1_000 {
        return format!("{ms} milliseconds");
    }
    let secs = ms.div_ceil(1_000);
    if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}

/// Calibration wizard bound to one backend and one display for its lifetime.
pub struct Wizard<'a> {
    backend: &'a dyn Backend,
    display: &'a mut dyn StatusDisplay,
    timings: Timings,
}

impl<'a> Wizard<'a> {
    pub fn new(backend: &'a dyn Backend, display: &'a mut dyn StatusDisplay) -> Self {
        Self {
            backend,
            display,
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Run the wizard against `file` (default `./keyCalibration.json`).
    ///
    /// Blocks until the run completes, is cancelled, or fails. Device open and
    /// file write failures are errors; an unreadable or malformed existing file
    /// only forces a full recalibration.
    pub fn calibrate(&mut self, file: Option<&Path>) -> Result<Calibration> {
        let path = file.unwrap_or_else(|| Path::new(DEFAULT_CALIBRATION_FILE));
        let gate = Arc::new(CaptureGate::new());
        let _listeners = self.listen(&gate)?;

        match self.resume_check(&gate, path) {
            Resume::Keep(map) => {
                self.persist(&map, path)?;
                return Ok(Calibration::Unchanged(map));
            }
            Resume::Cancelled => return Ok(self.cancelled()),
            Resume::Recalibrate => {}
        }

        if !self.intro(&gate) {
            return Ok(self.cancelled());
        }

        for action in MenuAction::CAPTURE_ORDER {
            if !self.capture(&gate, action) {
                return Ok(self.cancelled());
            }
        }

        let map = gate.take_bindings();
        self.persist(&map, path)?;
        Ok(Calibration::Calibrated(map))
    }

    /// Open every enumerated device and route its events into `gate`.
    fn listen(&self, gate: &Arc<CaptureGate>) -> Result<ListenerManager> {
        let devices = self.backend.enumerate()?;
        if devices.is_empty() {
            warn!("no input devices found, calibration cannot capture any key");
        }

        let mut manager = ListenerManager::new();
        for path in devices {
            let listener = self.backend.open(&path)?;
            let g = gate.clone();
            listener.set_root(Arc::new(move |dev: &str, keycode: u16, is_release: bool| {
                g.observe(dev, keycode, is_release)
            }));
            manager.spawn(listener)?;
        }
        info!(devices = manager.len(), "listening for calibration");
        Ok(manager)
    }

    fn resume_check(&mut self, gate: &CaptureGate, path: &Path) -> Resume {
        let existing = match BindingMap::load(path) {
            Ok(map) => map,
            Err(Error::ReadCalibration { source, .. }) => {
                debug!(path = %path.display(), "no usable calibration file: {source}");
                return Resume::Recalibrate;
            }
            Err(e) => {
                warn!("{e}; recalibrating");
                return Resume::Recalibrate;
            }
        };

        gate.arm(Pending::DetectOnly);
        self.display.clear();
        self.display.print_line(&format!(
            "Press any key within\n{} to recalibrate.",
            window_text(self.timings.resume_window())
        ));

        match gate.wait_for_capture(Some(self.timings.resume_window())) {
            Wait::TimedOut => {
                info!(path = %path.display(), "keeping existing calibration");
                Resume::Keep(existing)
            }
            Wait::Captured => {
                info!("recalibration requested");
                self.display.print_line("Recalibration time!");
                // The gate stays armed here so the release of that key is absorbed.
                if gate.pause(self.timings.recalibrate_pause()) {
                    Resume::Recalibrate
                } else {
                    Resume::Cancelled
                }
            }
            Wait::Cancelled => Resume::Cancelled,
        }
    }

    /// Returns `false` if the operator cancelled.
    fn intro(&mut self, gate: &CaptureGate) -> bool {
        gate.disarm();
        gate.reset();
        self.display.clear();
        for (i, part) in INTRO.iter().enumerate() {
            for line in part.iter() {
                self.display.print_line(line);
            }
            if !gate.pause(self.timings.intro_delay(i)) {
                return false;
            }
        }
        true
    }

    /// Returns `false` if the operator cancelled.
    fn capture(&mut self, gate: &CaptureGate, action: MenuAction) -> bool {
        if action == MenuAction::CAPTURE_ORDER[0] {
            self.display.clear();
        }
        gate.arm(Pending::Capture(action));

        let (prompt, hint) = capture_prompt(action);
        self.display.print_line("");
        self.display.print_line(prompt);
        self.display.print_line(hint);

        info!(%action, "waiting for key");
        gate.wait_for_capture(None) == Wait::Captured
    }

    fn persist(&mut self, map: &BindingMap, path: &Path) -> Result<()> {
        self.display.clear();
        self.display.print_line("Saving results...");
        map.save(path)?;
        info!(path = %path.display(), devices = map.len(), "saved calibration");
        Ok(())
    }

    fn cancelled(&self) -> Calibration {
        info!("calibration cancelled");
        Calibration::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_window_text_never_reads_zero() {
        assert_eq!(window_text(Duration::from_millis(300)), "300 milliseconds");
        assert_eq!(window_text(Duration::from_millis(1_000)), "1 second");
        assert_eq!(window_text(Duration::from_millis(1_500)), "2 seconds");
        assert_eq!(window_text(Duration::from_secs(5)), "5 seconds");
    }
}
