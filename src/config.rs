// ⚙️ Configuration - Settings as Data
// JSON files loaded with serde; every field has a default so an empty `{}` is valid.

use anyhow::{Context as AnyhowContext, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "LAB_UTILS_CONFIG";

/// Ledger file name used when the location is fixed and no path is configured.
pub const DEFAULT_LEDGER_FILE: &str = "timesheet.tsv";

// ============================================================================
// MERGER SETTINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Sequence line width in the output FASTA
    pub wrap_width: usize,

    /// Drop records with protein existence level 5 ("dubious")
    pub drop_dubious: bool,

    /// Seed for the deterministic tie-breaker (None = keep input order on ties)
    pub tie_breaker_seed: Option<u64>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            wrap_width: 60,
            drop_dubious: false,
            tie_breaker_seed: Some(0),
        }
    }
}

// ============================================================================
// PUNCH SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerLocation {
    /// First positional argument after the command is the ledger path
    Argument,
    /// Ledger lives at `ledger_path` (or next to the executable)
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PunchConfig {
    pub ledger_location: LedgerLocation,

    /// Used only with `LedgerLocation::Fixed`
    pub ledger_path: Option<PathBuf>,

    /// Accept vin/vout punches
    pub track_vacation: bool,

    /// Last day of a week bucket
    pub week_ends_on: Weekday,

    /// Expected hours per week for the lack/excess figure
    pub weekly_hours: i64,
}

impl Default for PunchConfig {
    fn default() -> Self {
        PunchConfig {
            ledger_location: LedgerLocation::Argument,
            ledger_path: None,
            track_vacation: true,
            week_ends_on: Weekday::Fri,
            weekly_hours: 40,
        }
    }
}

impl PunchConfig {
    /// Resolve the ledger path for fixed-location mode
    pub fn fixed_ledger_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.ledger_path {
            return Ok(path.clone());
        }

        let exe = env::current_exe().context("Failed to locate the running executable")?;
        let dir = exe
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory: {}", exe.display()))?;
        Ok(dir.join(DEFAULT_LEDGER_FILE))
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load a config of type `T` from a JSON file
pub fn from_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config JSON: {:?}", path.as_ref()))
}

/// Load from `explicit`, else from `$LAB_UTILS_CONFIG`, else defaults
pub fn load<T>(explicit: Option<&Path>) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if let Some(path) = explicit {
        return from_file(path);
    }

    match env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => {
            tracing::debug!(path = ?path, "loading config from environment");
            from_file(PathBuf::from(path))
        }
        _ => Ok(T::default()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
