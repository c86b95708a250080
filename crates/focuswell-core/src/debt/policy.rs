//! Conservative mode - duration gating driven by total recovery debt.
//!
//! ## Tiers
//!
//! | total debt | risk     | max block |
//! |------------|----------|-----------|
//! | >= 10      | Critical | 25 min    |
//! | >= 5       | High     | 50 min    |
//! | >= 3       | Moderate | 90 min    |
//! | otherwise  | Low      | 180 min   |
//!
//! The policy is pure. Callers must re-derive it from the live ledger every
//! time a block is created, never from a cached value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Fatigue risk implied by total debt. Display-only; behaviour lives in
/// [`ConservativeModePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Debt threshold and the duration cap it unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: u32,
    pub max_duration_min: u32,
    pub risk: RiskLevel,
}

/// Step-function policy mapping total debt to a maximum block length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConservativeModePolicy {
    /// Shortest block anyone may plan.
    pub min_duration_min: u32,
    /// Hard ceiling, also the cap at zero debt.
    pub max_duration_min: u32,
    /// Highest threshold first.
    tiers: Vec<Tier>,
}

impl Default for ConservativeModePolicy {
    fn default() -> Self {
        Self {
            min_duration_min: 5,
            max_duration_min: 180,
            tiers: vec![
                Tier {
                    threshold: 10,
                    max_duration_min: 25,
                    risk: RiskLevel::Critical,
                },
                Tier {
                    threshold: 5,
                    max_duration_min: 50,
                    risk: RiskLevel::High,
                },
                Tier {
                    threshold: 3,
                    max_duration_min: 90,
                    risk: RiskLevel::Moderate,
                },
            ],
        }
    }
}

impl ConservativeModePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier(&self, total_debt: u32) -> Option<&Tier> {
        self.tiers.iter().find(|t| total_debt >= t.threshold)
    }

    /// Longest block (minutes) allowed at this debt level.
    pub fn max_allowed_duration(&self, total_debt: u32) -> u32 {
        self.tier(total_debt)
            .map(|t| t.max_duration_min)
            .unwrap_or(self.max_duration_min)
    }

    pub fn risk_level(&self, total_debt: u32) -> RiskLevel {
        self.tier(total_debt).map(|t| t.risk).unwrap_or(RiskLevel::Low)
    }

    /// True once debt is high enough that any cap below the ceiling applies.
    pub fn is_active(&self, total_debt: u32) -> bool {
        self.tier(total_debt).is_some()
    }

    /// Check a requested block length against the bounds and the current cap.
    pub fn validate_duration(
        &self,
        requested: u32,
        total_debt: u32,
    ) -> Result<(), ValidationError> {
        if requested < self.min_duration_min {
            return Err(ValidationError::DurationTooShort {
                requested,
                minimum: self.min_duration_min,
            });
        }
        if requested > self.max_duration_min {
            return Err(ValidationError::DurationTooLong {
                requested,
                maximum: self.max_duration_min,
            });
        }
        let max_allowed = self.max_allowed_duration(total_debt);
        if requested > max_allowed {
            return Err(ValidationError::ConservativeLimit {
                requested,
                max_allowed,
                total_debt,
                risk: self.risk_level(total_debt),
            });
        }
        Ok(())
    }
}
