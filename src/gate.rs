//! The capture gate.
//!
//! During calibration every listener's root callback feeds [`CaptureGate::observe`].
//! The gate decides, under a single lock, whether the event cancels the run,
//! ends a wait, or becomes a binding. The wizard arms the gate and then waits
//! on its condition variable for the outcome.

use crate::binding::{BindingMap, KeyBinding};
use crate::menu::MenuAction;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// What the gate is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Record the next pressed key as a binding for this action.
    Capture(MenuAction),
    /// Any key clears the wait without producing a binding.
    DetectOnly,
}

/// Result of waiting on the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The pending action was consumed.
    Captured,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Default)]
struct GateState {
    ready: bool,
    cancelled: bool,
    pending: Option<Pending>,
    accumulator: BindingMap,
}

/// Shared calibration state. See the module docs.
#[derive(Debug, Default)]
pub struct CaptureGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl CaptureGate {
    /// A disarmed gate: the first event it sees cancels the run.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Feed one raw event from `device_id`.
    pub fn observe(&self, device_id: &str, keycode: u16, is_release: bool) {
        let mut s = self.lock();
        if s.cancelled {
            return;
        }
        if !s.ready {
            debug!(device = device_id, keycode, "key before gate armed, cancelling");
            s.cancelled = true;
            self.changed.notify_all();
            return;
        }
        let action = match s.pending {
            None | Some(Pending::DetectOnly) => {
                s.pending = None;
                self.changed.notify_all();
                return;
            }
            Some(Pending::Capture(action)) => action,
        };
        if is_release {
            return;
        }
        debug!(device = device_id, keycode, %action, "captured key");
        s.accumulator.push(device_id, KeyBinding::captured(keycode, action));
        s.pending = None;
        self.changed.notify_all();
    }

    /// Accept events and wait for `pending`.
    pub fn arm(&self, pending: Pending) {
        let mut s = self.lock();
        s.ready = true;
        s.pending = Some(pending);
    }

    /// Stop accepting events: any key from now on cancels the run.
    pub fn disarm(&self) {
        let mut s = self.lock();
        s.ready = false;
        s.pending = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    pub fn pending(&self) -> Option<Pending> {
        self.lock().pending
    }

    /// Block until the pending action is consumed, the run is cancelled, or
    /// `timeout` elapses (`None` waits indefinitely).
    pub fn wait_for_capture(&self, timeout: Option<Duration>) -> Wait {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut s = self.lock();
        loop {
            if s.cancelled {
                return Wait::Cancelled;
            }
            if s.pending.is_none() {
                return Wait::Captured;
            }
            s = match deadline {
                None => self
                    .changed
                    .wait(s)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Wait::TimedOut;
                    }
                    self.changed
                        .wait_timeout(s, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
            };
        }
    }

    /// Sleep for `duration`, waking early on cancellation.
    ///
    /// Returns `false` if the run is cancelled.
    pub fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut s = self.lock();
        loop {
            if s.cancelled {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            s = self
                .changed
                .wait_timeout(s, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .0;
        }
    }

    /// Drop every binding captured so far.
    pub fn reset(&self) {
        self.lock().accumulator = BindingMap::new();
    }

    /// Copy of the bindings captured so far.
    pub fn snapshot(&self) -> BindingMap {
        self.lock().accumulator.clone()
    }

    /// Take the captured bindings, leaving the accumulator empty.
    pub fn take_bindings(&self) -> BindingMap {
        std::mem::take(&mut self.lock().accumulator)
    }
}
