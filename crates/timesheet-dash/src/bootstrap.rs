use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use timesheet_core::settings::{Settings, View};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Name of the per-user state directory under `$HOME`.
pub const APP_DIR: &str = ".timesheet-dash";

/// Ensure `~/.timesheet-dash/` and `~/.timesheet-dash/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(app_dir.join("logs"))?;
    Ok(app_dir)
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// File name of the default dashboard log under `<app dir>/logs/`.
pub const DASHBOARD_LOG: &str = "timesheet-dash.log";

/// Where log output goes: `--log-file` when given, the app's log directory
/// while the dashboard owns the terminal, stderr (`None`) otherwise.
pub fn log_destination(settings: &Settings, app_dir: &Path) -> Option<PathBuf> {
    match (&settings.log_file, settings.view) {
        (Some(path), _) => Some(path.clone()),
        (None, View::Dashboard) => Some(app_dir.join("logs").join(DASHBOARD_LOG)),
        (None, View::Report | View::Summary) => None,
    }
}

/// Map a `--log-level` name to an [`EnvFilter`] directive.
///
/// `RUST_LOG`, when set, takes precedence over the flag.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr, or to `log_file` (appending, no ANSI colours) when one
/// is given.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Open `path` for appending, creating parent directories as needed.
pub fn open_log_file(path: &Path) -> anyhow::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
