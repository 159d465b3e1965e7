//! Runtime configuration.
//!
//! Loaded from a TOML file; every field is optional and falls back to the
//! defaults below.
//!
//! ```toml
//! calibration_file = "/var/lib/kiosk/keyCalibration.json"
//! input_root = "/dev/input"
//!
//! [timings]
//! resume_window_ms = 5000
//! recalibrate_pause_ms = 2000
//! intro_delays_ms = [2000, 2000, 3000]
//! poll_interval_ms = 10
//! ```

use crate::backends::INPUT_ROOT;
use crate::binding::DEFAULT_CALIBRATION_FILE;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub calibration_file: PathBuf,
    pub input_root: PathBuf,
    pub timings: Timings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calibration_file: PathBuf::from(DEFAULT_CALIBRATION_FILE),
            input_root: PathBuf::from(INPUT_ROOT),
            timings: Timings::default(),
        }
    }
}

impl Config {
    /// Load config from `path`, or return defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_err = |source: Box<dyn std::error::Error + Send + Sync>| Error::Config {
            path: path.to_path_buf(),
            source,
        };
        let content = fs::read_to_string(path).map_err(|e| config_err(Box::new(e)))?;
        toml::from_str(&content).map_err(|e| config_err(Box::new(e)))
    }
}

/// Wizard stage durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// How long the resume prompt waits for a key before keeping the old map.
    pub resume_window_ms: u64,
    /// Pause after the user asks to recalibrate.
    pub recalibrate_pause_ms: u64,
    /// Delay after each part of the intro.
    pub intro_delays_ms: Vec<u64>,
    /// Sleep between reads of an idle evdev node.
    pub poll_interval_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            resume_window_ms: 5_000,
            recalibrate_pause_ms: 2_000,
            intro_delays_ms: vec![2_000, 2_000, 3_000],
            poll_interval_ms: 10,
        }
    }
}

impl Timings {
    pub fn resume_window(&self) -> Duration {
        Duration::from_millis(self.resume_window_ms)
    }

    pub fn recalibrate_pause(&self) -> Duration {
        Duration::from_millis(self.recalibrate_pause_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay after intro part `index`; parts past the configured list get none.
    pub fn intro_delay(&self, index: usize) -> Duration {
        self.intro_delays_ms
            .get(index)
            .map(|ms| Duration::from_millis(*ms))
            .unwrap_or_default()
    }
}
