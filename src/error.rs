//! Crate-wide error type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot enumerate input devices under {root}: {source}")]
    Enumerate {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot listen to input device {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("input device {path} stopped delivering events: {source}")]
    Listener {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot start listener thread for input device {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot read calibration file {path}: {source}")]
    ReadCalibration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed calibration file {path}: {source}")]
    ParseCalibration {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown action {action:?} bound on device {device}")]
    UnknownAction { device: String, action: String },

    #[error("cannot encode calibration results: {0}")]
    EncodeCalibration(#[source] serde_json::Error),

    #[error("cannot write calibration file {path}: {source}")]
    WriteCalibration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
