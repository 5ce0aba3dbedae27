use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::models::{AttendanceStatus, DateRangeKind};

/// Name of the per-user configuration directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".attendance-tracker";

/// Default rate below which a student is listed as at risk.
pub const DEFAULT_AT_RISK_THRESHOLD: f64 = 85.0;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Daily attendance tracking for a class roster
#[derive(Parser, Debug, Clone)]
#[command(
    name = "attendance-tracker",
    about = "Daily attendance tracking for a class roster",
    version
)]
pub struct Settings {
    /// Directory holding the students and attendance documents
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Timezone used to decide what "today" is (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Attendance rate (percent) below which a student is at risk
    #[arg(long, default_value_t = DEFAULT_AT_RISK_THRESHOLD)]
    pub threshold: f64,

    /// Seed the five demo students when the roster is empty
    #[arg(long)]
    pub seed_demo: bool,

    /// Logging level
    #[arg(
        long,
        default_value = "INFO",
        value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"]
    )]
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

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Actions available from the command line.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Mark a student Present, Late or Absent
    Mark {
        name: String,
        status: AttendanceStatus,
        /// Date to mark (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Add a student to the roster
    AddStudent {
        name: String,
        #[arg(long, default_value = "")]
        id: String,
        #[arg(long, default_value = "")]
        class: String,
    },
    /// Remove a student and all of their attendance records
    RemoveStudent { name: String },
    /// List students with their status on a date
    List {
        /// Match against name or id (case-insensitive)
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Import students from a CSV file with a `name` column
    Import { path: PathBuf },
    /// Export attendance (or the student list) as CSV
    Export {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = DateRangeKind::All)]
        range: DateRangeKind,
        /// Export the student list instead of attendance
        #[arg(long)]
        students: bool,
    },
    /// Show the day summary
    Summary {
        #[arg(long)]
        date: Option<String>,
    },
    /// Show dashboard statistics
    Stats {
        #[arg(long)]
        class: Option<String>,
        #[arg(long, value_enum, default_value_t = DateRangeKind::All)]
        range: DateRangeKind,
    },
    /// List students whose attendance rate is below the threshold
    AtRisk {
        #[arg(long)]
        class: Option<String>,
        #[arg(long, value_enum, default_value_t = DateRangeKind::All)]
        range: DateRangeKind,
    },
    /// Show one student's attendance history
    History {
        name: String,
        #[arg(long, value_enum, default_value_t = DateRangeKind::All)]
        range: DateRangeKind,
    },
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.attendance-tracker/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
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
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "could not clear saved configuration");
            }
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "threshold") {
            if let Some(v) = last.threshold {
                settings.threshold = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "could not persist last-used configuration");
        }

        settings
    }

    /// Resolve `"auto"` sentinel values, clamp the threshold and apply `--debug`.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if !crate::time_utils::validate_timezone(&settings.timezone) {
            tracing::warn!(timezone = %settings.timezone, "unknown timezone, using UTC");
            settings.timezone = "UTC".to_string();
        }

        if !settings.threshold.is_finite() {
            settings.threshold = DEFAULT_AT_RISK_THRESHOLD;
        }
        settings.threshold = settings.threshold.clamp(0.0, 100.0);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Directory holding the store documents, defaulting to
    /// `~/.attendance-tracker/data`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR_NAME).join("data"))
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            timezone: Some(s.timezone.clone()),
            threshold: Some(s.threshold),
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
