use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TimesheetError};
use crate::models::{ChartKind, LabelStyle};

// ── View ───────────────────────────────────────────────────────────────────────

/// What the binary does with the aggregated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum View {
    /// Write the static HTML report (and the CSV export when requested).
    Report,
    /// Interactive terminal dashboard with filters.
    Dashboard,
    /// Print KPIs and duplicate candidates to stdout.
    Summary,
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            View::Report => "report",
            View::Dashboard => "dashboard",
            View::Summary => "summary",
        };
        f.write_str(name)
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Timesheet hours analytics: aggregate, report and explore
#[derive(Parser, Debug, Clone)]
#[command(
    name = "timesheet-dash",
    about = "Aggregate timesheet exports into charts, CSV and a terminal dashboard",
    version
)]
pub struct Settings {
    /// JSON export with a top-level `data` array
    #[arg(long, default_value = "data.json")]
    pub source: PathBuf,

    /// What to produce
    #[arg(long, value_enum, default_value_t = View::Report)]
    pub view: View,

    /// HTML report destination
    #[arg(long, default_value = "index.html")]
    pub output: PathBuf,

    /// Charts embedded in the report (repeatable)
    #[arg(long = "chart", value_enum, default_values_t = [ChartKind::Bar])]
    pub charts: Vec<ChartKind>,

    /// Only keep rows for this project number
    #[arg(long)]
    pub project: Option<String>,

    /// Only keep rows for this employee
    #[arg(long)]
    pub employee: Option<String>,

    /// Include detail tables in the report
    #[arg(long)]
    pub details: bool,

    /// Also export the filtered rows as CSV to this path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Description characters kept in project labels (0 = no limit)
    #[arg(long, default_value = "50")]
    pub label_limit: usize,

    /// Display theme for the dashboard
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.timesheet-dash/last_used.json`.
///
/// Filters (`--project`, `--employee`) are deliberately not persisted.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<View>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<ChartKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".timesheet-dash").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "ignoring unreadable last-used params");
            Self::default()
        })
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::io::Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation: accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear last-used params");
            }
            return Self::apply_debug_flag(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "source") {
            if let Some(v) = last.source {
                settings.source = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "charts") {
            if let Some(v) = last.charts.filter(|c| !c.is_empty()) {
                settings.charts = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "label_limit") {
            if let Some(v) = last.label_limit {
                settings.label_limit = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::apply_debug_flag(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not persist last-used params");
        }

        settings
    }

    /// Label style derived from `--label-limit` (0 disables truncation).
    pub fn label_style(&self) -> LabelStyle {
        let limit = (self.label_limit > 0).then_some(self.label_limit);
        LabelStyle::with_limit(limit)
    }

    /// Reject flag combinations that would clobber an input or each other.
    pub fn validate(&self) -> Result<()> {
        if self.output == self.source {
            return Err(TimesheetError::Config(
                "--output must not overwrite --source".to_string(),
            ));
        }
        if let Some(csv) = &self.csv {
            if csv == &self.output || csv == &self.source {
                return Err(TimesheetError::Config(format!(
                    "--csv {} collides with another file argument",
                    csv.display()
                )));
            }
        }
        if self.view == View::Report && self.output.is_dir() {
            return Err(TimesheetError::Config(format!(
                "--output {} is a directory",
                self.output.display()
            )));
        }
        Ok(())
    }

    /// `--debug` overrides the log level.
    fn apply_debug_flag(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            source: Some(s.source.clone()),
            view: Some(s.view),
            charts: Some(s.charts.clone()),
            label_limit: Some(s.label_limit),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
