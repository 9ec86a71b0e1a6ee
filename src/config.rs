//! Reconciliation tuning knobs

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Configuration for candidate lookup and automatic matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Largest absolute residual still treated as zero.
    #[serde(default = "default_tolerance")]
    pub tolerance: BigDecimal,
    /// Maximum number of candidate lines fetched for a payment.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
    /// Largest combination of candidate lines tried by automatic matching.
    #[serde(default = "default_max_combination_size")]
    pub max_combination_size: usize,
    /// Stop the combination walk after this many subsets. `None` is exhaustive.
    #[serde(default)]
    pub max_search_nodes: Option<u64>,
}

fn default_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

fn default_candidate_limit() -> usize {
    100
}

fn default_max_combination_size() -> usize {
    5
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            candidate_limit: default_candidate_limit(),
            max_combination_size: default_max_combination_size(),
            max_search_nodes: None,
        }
    }
}

impl ReconcileConfig {
    /// Loads configuration from a JSON document; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Config`] if the document is malformed or the
    /// resulting values are out of range.
    pub fn from_json(json: &str) -> ReconcileResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReconcileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values make sense together
    pub fn validate(&self) -> ReconcileResult<()> {
        if self.tolerance <= BigDecimal::from(0) {
            return Err(ReconcileError::Config(
                "Tolerance must be positive".to_string(),
            ));
        }

        if self.candidate_limit == 0 {
            return Err(ReconcileError::Config(
                "Candidate limit must be at least 1".to_string(),
            ));
        }

        if self.max_combination_size == 0 {
            return Err(ReconcileError::Config(
                "Maximum combination size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
