//! tabkeeper daemon entrypoint.
//!
//! Single-writer service between a browser host bridge and the tab engine.
//! The bridge writes host events, query replies, modifier relays and keyboard
//! commands to stdin as JSON lines; the daemon answers with host commands on
//! stdout. Logs go to stderr so they never mix with the command stream.
//! A `reload_settings` message re-reads the settings file without a restart.

use clap::Parser;
use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tabkeeper_core::{default_settings_path, Engine, Settings, SettingsStore};

mod bridge;

#[derive(Parser)]
#[command(name = "tabkeeper-daemon")]
#[command(about = "Tab placement and close-focus daemon for a browser host bridge")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ~/.tabkeeper/settings.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the settings' startup delay before host events are handled
    #[arg(long, value_name = "MS")]
    startup_delay_ms: Option<u64>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let settings_path = resolve_settings_path(cli.config);
    let settings = settings_path
        .as_deref()
        .map(load_settings_or_default)
        .unwrap_or_default();
    let startup_delay = cli
        .startup_delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| settings.startup_delay());
    info!(
        on_open = ?settings.on_open,
        open_in_order = settings.open_in_order,
        on_close = ?settings.on_close,
        focus_on_open = ?settings.focus_on_open,
        startup_delay_ms = startup_delay.as_millis() as u64,
        "tabkeeper daemon started"
    );

    let (tx, rx) = mpsc::channel();
    let _reader = bridge::spawn_reader(io::BufReader::new(io::stdin()), tx);

    let mut engine = Engine::new(settings);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = bridge::run(
        &mut engine,
        &rx,
        &mut out,
        startup_delay,
        settings_path.as_deref(),
    ) {
        error!(error = %err, "Failed to write to host bridge");
        std::process::exit(1);
    }
}

fn init_logging() {
    let debug_enabled = env::var("TABKEEPER_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve_settings_path(config: Option<PathBuf>) -> Option<PathBuf> {
    match config {
        Some(path) => Some(path),
        None => match default_settings_path() {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(error = %err, "Failed to resolve settings path; using defaults");
                None
            }
        },
    }
}

/// Opens the settings store, writing defaults for any missing keys. Any
/// failure falls back to default settings.
fn load_settings_or_default(path: &Path) -> Settings {
    let mut store = match SettingsStore::open(path) {
        Ok(store) => store,
        Err(err) => {
            warn!(error = %err, path = %path.display(), "Failed to load settings; using defaults");
            return Settings::default();
        }
    };
    if store.first_run() {
        info!(path = %store.path().display(), "First run; writing default settings");
    }
    if let Err(err) = store.init() {
        warn!(error = %err, path = %store.path().display(), "Failed to write default settings");
    }
    store.settings().clone()
}
