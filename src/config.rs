//! Run configuration.
//!
//! Everything the analysis depends on is carried in [`AnalysisConfig`] and
//! passed explicitly. The cutoff is read from the environment exactly once,
//! by the caller, before any query runs.

use std::path::PathBuf;

use crate::analysis::leaderboard::DEFAULT_LIMIT;
use crate::analysis::migration::AxisPolicy;
use crate::analysis::types::{Cutoff, LabelStyle, ReportMetadata};
use crate::error::ConfigError;
use crate::store::DEFAULT_TABLE;

/// Environment variable holding the cutoff timestamp.
pub const CUTOFF_ENV_VAR: &str = "BASE_TIME";

/// Database file read when no path is given.
pub const DEFAULT_DB_PATH: &str = "nodes_history.sqlite";

/// Read the cutoff from [`CUTOFF_ENV_VAR`].
pub fn cutoff_from_env() -> Result<Cutoff, ConfigError> {
    cutoff_from_lookup(CUTOFF_ENV_VAR, |var| std::env::var(var).ok())
}

/// Read the cutoff through `lookup`, which maps a variable name to its value.
pub fn cutoff_from_lookup<F>(var: &str, lookup: F) -> Result<Cutoff, ConfigError>
where
    F: FnOnce(&str) -> Option<String>,
{
    let value = lookup(var).ok_or_else(|| ConfigError::MissingCutoff {
        var: var.to_string(),
    })?;

    value
        .trim()
        .parse::<i64>()
        .map(Cutoff::new)
        .map_err(|_| ConfigError::InvalidCutoff {
            var: var.to_string(),
            value,
        })
}

/// Settings for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub db_path: PathBuf,
    pub table: String,
    /// Rows kept per leaderboard
    pub limit: usize,
    pub cutoff: Option<Cutoff>,
    pub label_style: LabelStyle,
    pub axis_policy: AxisPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table: DEFAULT_TABLE.to_string(),
            limit: DEFAULT_LIMIT,
            cutoff: None,
            label_style: LabelStyle::Core,
            axis_policy: AxisPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::InvalidLimit(self.limit));
        }
        Ok(())
    }

    /// The cutoff, or the same error a missing environment variable gives.
    pub fn require_cutoff(&self) -> Result<Cutoff, ConfigError> {
        self.cutoff.ok_or_else(|| ConfigError::MissingCutoff {
            var: CUTOFF_ENV_VAR.to_string(),
        })
    }

    pub fn metadata(&self, limit: Option<usize>) -> ReportMetadata {
        ReportMetadata {
            database: self.db_path.display().to_string(),
            table: self.table.clone(),
            cutoff: self.cutoff.map(Cutoff::secs),
            cutoff_utc: self.cutoff.and_then(Cutoff::to_rfc3339),
            limit,
        }
    }
}
