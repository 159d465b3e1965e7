//! `menubind` command-line tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use menubind::backends::probe_devices;
use menubind::logger::Logger;
use menubind::{
    Backend, BindingActivator, Calibration, Config, Navigator, TerminalStatus, Wizard,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "menubind")]
#[command(about = "Calibrate input devices for menu navigation")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "menubind.toml")]
    config: PathBuf,

    /// Calibration file (overrides the config file)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Directory holding input event nodes (overrides the config file)
    #[arg(long, global = true)]
    input_root: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List input devices calibration would listen to
    Devices,
    /// Log every key event from every device
    Monitor,
    /// Run the calibration wizard
    Calibrate,
    /// Activate a calibration file and log the resulting menu actions
    Listen,
}

/// Navigator that only logs, for trying out a calibration file.
#[derive(Default)]
struct LogNavigator {
    cursor: AtomicUsize,
}

impl Navigator for LogNavigator {
    fn previous_item(&self) {
        let prev = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some(c.saturating_sub(1)))
            .unwrap_or_default();
        info!(item = prev.saturating_sub(1), "previous item");
    }

    fn next_item(&self) {
        let prev = self.cursor.fetch_add(1, Ordering::SeqCst);
        info!(item = prev + 1, "next item");
    }

    fn select_item(&self) {
        info!(item = self.cursor.load(Ordering::SeqCst), "select item");
    }
}

#[cfg(all(feature = "evdev", target_os = "linux"))]
fn open_backend(config: &Config) -> Result<Box<dyn Backend>> {
    let backend = menubind::backends::evdev::EvdevBackend::new(&config.input_root)
        .with_poll_interval(config.timings.poll_interval());
    Ok(Box::new(backend))
}

#[cfg(not(all(feature = "evdev", target_os = "linux")))]
fn open_backend(_config: &Config) -> Result<Box<dyn Backend>> {
    anyhow::bail!("no input backend available on this platform")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::load(&cli.config)?;
    if let Some(file) = cli.file {
        config.calibration_file = file;
    }
    if let Some(root) = cli.input_root {
        config.input_root = root;
    }

    match cli.command {
        Command::Devices => list_devices(&config.input_root),
        Command::Monitor => {
            let backend = open_backend(&config)?;
            let mut listeners = Logger::attach(&*backend)?;
            info!(devices = listeners.len(), "monitoring, press Ctrl+C to exit");
            listeners.join();
            Ok(())
        }
        Command::Calibrate => calibrate(&config),
        Command::Listen => {
            let backend = open_backend(&config)?;
            let activator = BindingActivator::new(&*backend, Arc::new(LogNavigator::default()));
            let active = activator
                .activate_file(&config.calibration_file)
                .with_context(|| {
                    format!("activating {}", config.calibration_file.display())
                })?;
            info!(devices = ?active.devices(), "listening, press Ctrl+C to exit");
            active.wait();
            Ok(())
        }
    }
}

fn list_devices(root: &Path) -> Result<()> {
    for path in probe_devices(root)? {
        #[cfg(all(feature = "evdev", target_os = "linux"))]
        {
            let name = menubind::backends::evdev::device_name(&path);
            println!("{}\t{}", path.display(), name.as_deref().unwrap_or("?"));
        }
        #[cfg(not(all(feature = "evdev", target_os = "linux")))]
        println!("{}", path.display());
    }
    Ok(())
}

fn calibrate(config: &Config) -> Result<()> {
    let backend = open_backend(config)?;
    let mut screen = TerminalStatus;
    let outcome = Wizard::new(&*backend, &mut screen)
        .with_timings(config.timings.clone())
        .calibrate(Some(config.calibration_file.as_path()))?;

    match outcome {
        Calibration::Calibrated(map) => {
            println!(
                "Calibration saved to {} ({} device(s)).",
                config.calibration_file.display(),
                map.len()
            );
        }
        Calibration::Unchanged(_) => {
            println!("Kept existing calibration.");
        }
        Calibration::Cancelled => {
            println!("Calibration cancelled.");
        }
    }
    Ok(())
}
