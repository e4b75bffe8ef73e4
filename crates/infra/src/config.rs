//! Configuration loading and representation.
//!
//! Settings come from `STOCKFLOW_*` environment variables, falling back to
//! defaults. Invalid values are configuration errors, never silently ignored.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use stockflow_core::DomainError;
use stockflow_observability::{LogConfig, LogFormat};

pub const ENV_MAX_COMMIT_ATTEMPTS: &str = "STOCKFLOW_MAX_COMMIT_ATTEMPTS";
pub const ENV_LOG_FORMAT: &str = "STOCKFLOW_LOG_FORMAT";
pub const ENV_DIAGNOSE_DRIFT: &str = "STOCKFLOW_DIAGNOSE_DRIFT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Attempts per write before a lost optimistic race surfaces as `Conflict`.
    pub max_commit_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Attach diagnosis findings to drifting audit reports.
    pub diagnose_drift: bool,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            diagnose_drift: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockflowConfig {
    pub ledger: LedgerConfig,
    pub reconciliation: ReconciliationConfig,
    pub log: LogConfig,
}

impl StockflowConfig {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DomainError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_COMMIT_ATTEMPTS) {
            let attempts: u32 = parse_var(ENV_MAX_COMMIT_ATTEMPTS, &raw)?;
            if attempts == 0 {
                return Err(DomainError::configuration(format!(
                    "{ENV_MAX_COMMIT_ATTEMPTS} must be at least 1"
                )));
            }
            config.ledger.max_commit_attempts = attempts;
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log.format = raw
                .parse::<LogFormat>()
                .map_err(|e| DomainError::configuration(format!("{ENV_LOG_FORMAT}: {e}")))?;
        }

        if let Some(raw) = lookup(ENV_DIAGNOSE_DRIFT) {
            config.reconciliation.diagnose_drift = parse_var(ENV_DIAGNOSE_DRIFT, &raw)?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, DomainError> {
    raw.trim()
        .parse()
        .map_err(|_| DomainError::configuration(format!("{key}: invalid value '{raw}'")))
}
