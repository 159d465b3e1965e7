//! Owns a set of running listeners.

use crate::device::KeyListener;
use crate::error::{Error, Result};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

struct Running {
    listener: Arc<dyn KeyListener>,
    thread: Option<JoinHandle<()>>,
}

/// Runs each listener on its own thread and closes them all when dropped.
///
/// Listener errors end that listener's thread and are logged; they do not
/// affect the other devices.
#[derive(Default)]
pub struct ListenerManager {
    running: Vec<Running>,
}

impl ListenerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `listener.run()` on a new thread.
    ///
    /// If the thread cannot be created the listener is closed and not managed.
    pub fn spawn(&mut self, listener: Arc<dyn KeyListener>) -> Result<()> {
        let worker = listener.clone();
        let name = format!("listen:{}", listener.id());
        let body = move || {
            debug!(device = worker.id(), "listener started");
            match worker.run() {
                Ok(()) => debug!(device = worker.id(), "listener closed"),
                Err(e) => warn!(device = worker.id(), "listener stopped: {e}"),
            }
        };
        let spawned = thread::Builder::new().name(name).spawn(body);
        self.track(listener, spawned)
    }

    fn track(
        &mut self,
        listener: Arc<dyn KeyListener>,
        spawned: io::Result<JoinHandle<()>>,
    ) -> Result<()> {
        match spawned {
            Ok(handle) => {
                self.running.push(Running {
                    listener,
                    thread: Some(handle),
                });
                Ok(())
            }
            Err(source) => {
                listener.close();
                Err(Error::Spawn {
                    path: listener.id().to_string(),
                    source,
                })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Device ids of every managed listener, in spawn order.
    pub fn devices(&self) -> Vec<String> {
        self.running
            .iter()
            .map(|r| r.listener.id().to_string())
            .collect()
    }

    /// Block until every listener thread has exited.
    pub fn join(&mut self) {
        for r in &mut self.running {
            if let Some(handle) = r.thread.take() {
                if handle.join().is_err() {
                    warn!(device = r.listener.id(), "listener thread panicked");
                }
            }
        }
    }

    /// Close every listener and wait for its thread.
    pub fn close_all(&mut self) {
        for r in &self.running {
            r.listener.close();
        }
        self.join();
        self.running.clear();
    }
}

impl Drop for ListenerManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
