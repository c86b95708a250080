//! Wellness protocols: short fixed-duration actions scheduled inside a block.

mod scheduler;

pub use scheduler::{ProtocolScheduler, TemplateTier};

use serde::{Deserialize, Serialize};

use crate::debt::DebtCategory;
use crate::error::ValidationError;

/// One scheduled wellness action. Immutable once its block exists; the
/// runtime status lives in the session timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Position in the sorted schedule.
    pub id: u32,
    pub name: String,
    pub category: DebtCategory,
    /// How long the action itself takes, in seconds.
    pub duration_secs: u32,
    /// Minutes from block start.
    pub trigger_minute: u32,
}

impl Protocol {
    /// Trigger offset in seconds from block start.
    pub fn trigger_secs(&self) -> u64 {
        u64::from(self.trigger_minute).saturating_mul(60)
    }
}

/// Lifecycle of a protocol within a running block.
///
/// `Pending -> Triggered -> (Completed | Skipped)`. Finalize forces every
/// unresolved protocol straight to `Skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolStatus {
    #[default]
    Pending,
    Triggered,
    Completed,
    Skipped,
}

impl ProtocolStatus {
    pub fn is_resolved(self) -> bool {
        matches!(self, ProtocolStatus::Completed | ProtocolStatus::Skipped)
    }
}

/// User response to a protocol prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolOutcome {
    Complete,
    Skip,
}

/// Enable flag and repeat interval for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySchedule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub interval_min: u32,
}

impl CategorySchedule {
    pub fn every(interval_min: u32) -> Self {
        Self { enabled: true, interval_min }
    }

    pub fn disabled(interval_min: u32) -> Self {
        Self { enabled: false, interval_min }
    }
}

/// Generation settings for configured-mode schedules. A copy is stored on
/// each block so later config edits do not rewrite history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_eye")]
    pub eye: CategorySchedule,
    #[serde(default = "default_hydration")]
    pub hydration: CategorySchedule,
    #[serde(default = "default_mobility")]
    pub mobility: CategorySchedule,
    #[serde(default = "default_posture")]
    pub posture: CategorySchedule,
}

fn default_true() -> bool {
    true
}
fn default_eye() -> CategorySchedule {
    CategorySchedule::every(20)
}
fn default_hydration() -> CategorySchedule {
    CategorySchedule::every(30)
}
fn default_mobility() -> CategorySchedule {
    CategorySchedule::every(40)
}
fn default_posture() -> CategorySchedule {
    CategorySchedule::every(25)
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            eye: default_eye(),
            hydration: default_hydration(),
            mobility: default_mobility(),
            posture: default_posture(),
        }
    }
}

impl ProtocolConfig {
    /// Everything disabled; useful as a base for enabling single categories.
    pub fn none() -> Self {
        let d = Self::default();
        Self {
            eye: CategorySchedule::disabled(d.eye.interval_min),
            hydration: CategorySchedule::disabled(d.hydration.interval_min),
            mobility: CategorySchedule::disabled(d.mobility.interval_min),
            posture: CategorySchedule::disabled(d.posture.interval_min),
        }
    }

    /// Schedule for a wellness category. `TimeDebt` has no protocols.
    pub fn get(&self, category: DebtCategory) -> Option<&CategorySchedule> {
        match category {
            DebtCategory::Eye => Some(&self.eye),
            DebtCategory::Hydration => Some(&self.hydration),
            DebtCategory::Mobility => Some(&self.mobility),
            DebtCategory::Posture => Some(&self.posture),
            DebtCategory::TimeDebt => None,
        }
    }

    pub fn get_mut(&mut self, category: DebtCategory) -> Option<&mut CategorySchedule> {
        match category {
            DebtCategory::Eye => Some(&mut self.eye),
            DebtCategory::Hydration => Some(&mut self.hydration),
            DebtCategory::Mobility => Some(&mut self.mobility),
            DebtCategory::Posture => Some(&mut self.posture),
            DebtCategory::TimeDebt => None,
        }
    }

    pub fn any_enabled(&self) -> bool {
        DebtCategory::WELLNESS
            .iter()
            .filter_map(|c| self.get(*c))
            .any(|s| s.enabled)
    }

    /// Enabled categories need a non-zero interval.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for category in DebtCategory::WELLNESS {
            if let Some(schedule) = self.get(category) {
                if schedule.enabled && schedule.interval_min == 0 {
                    return Err(ValidationError::InvalidInterval {
                        category: category.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
