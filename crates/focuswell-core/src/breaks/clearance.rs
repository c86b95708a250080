use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debt::{DebtCategory, DebtLedger};
use crate::error::ValidationError;
use crate::stats::Stats;

/// Where the break was spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakType {
    ScreenFree,
    OnScreen,
}

impl BreakType {
    /// Minutes of break per unit of eye debt cleared.
    pub fn eye_rate_min(self) -> u32 {
        match self {
            BreakType::ScreenFree => 60,
            BreakType::OnScreen => 120,
        }
    }
}

/// Activities done during the break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFlags {
    #[serde(default)]
    pub hydration: bool,
    #[serde(default)]
    pub mobility: bool,
    #[serde(default)]
    pub posture: bool,
}

/// Debt units removed per category by one break.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clearance {
    #[serde(default)]
    pub eye: u32,
    #[serde(default)]
    pub hydration: u32,
    #[serde(default)]
    pub mobility: u32,
    #[serde(default)]
    pub posture: u32,
}

impl Clearance {
    pub fn total(&self) -> u32 {
        self.eye + self.hydration + self.mobility + self.posture
    }

    pub fn get(&self, category: DebtCategory) -> u32 {
        match category {
            DebtCategory::Eye => self.eye,
            DebtCategory::Hydration => self.hydration,
            DebtCategory::Mobility => self.mobility,
            DebtCategory::Posture => self.posture,
            DebtCategory::TimeDebt => 0,
        }
    }
}

/// Append-only record of a logged break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakLog {
    pub id: String,
    #[serde(rename = "type")]
    pub break_type: BreakType,
    pub duration_min: u32,
    #[serde(default)]
    pub activities: ActivityFlags,
    #[serde(default)]
    pub clearance: Clearance,
    pub timestamp: DateTime<Utc>,
}

/// What a break would clear right now, without applying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearancePreview {
    pub clearance: Clearance,
    pub total_debt_before: u32,
    pub total_debt_after: u32,
}

/// Computes and applies break clearance.
#[derive(Debug, Clone)]
pub struct BreakClearanceCalculator {
    /// Shortest break that counts as a quality break.
    min_duration_min: u32,
    /// Minutes of flagged mobility per unit cleared.
    mobility_rate_min: u32,
}

impl Default for BreakClearanceCalculator {
    fn default() -> Self {
        Self {
            min_duration_min: Self::MIN_DURATION_MIN,
            mobility_rate_min: 20,
        }
    }
}

impl BreakClearanceCalculator {
    pub const MIN_DURATION_MIN: u32 = 60;

    pub fn new() -> Self {
        Self::default()
    }

    /// Calculator with a stricter minimum. Values below
    /// [`Self::MIN_DURATION_MIN`] are raised to it.
    pub fn with_min_duration(min_duration_min: u32) -> Self {
        Self {
            min_duration_min: min_duration_min.max(Self::MIN_DURATION_MIN),
            ..Self::default()
        }
    }

    pub fn min_duration_min(&self) -> u32 {
        self.min_duration_min
    }

    /// Per-category clearance for a break, capped at current debt.
    pub fn calculate(
        &self,
        duration_min: u32,
        break_type: BreakType,
        activities: ActivityFlags,
        ledger: &DebtLedger,
    ) -> Result<Clearance, ValidationError> {
        if duration_min < self.min_duration_min {
            return Err(ValidationError::BreakTooShort {
                minutes: duration_min,
                minimum: self.min_duration_min,
            });
        }

        let eye = duration_min / break_type.eye_rate_min();
        let hydration = u32::from(activities.hydration);
        let mobility = if activities.mobility {
            duration_min / self.mobility_rate_min.max(1)
        } else {
            0
        };
        let posture = u32::from(activities.posture);

        Ok(Clearance {
            eye: eye.min(ledger.get(DebtCategory::Eye)),
            hydration: hydration.min(ledger.get(DebtCategory::Hydration)),
            mobility: mobility.min(ledger.get(DebtCategory::Mobility)),
            posture: posture.min(ledger.get(DebtCategory::Posture)),
        })
    }

    pub fn preview(
        &self,
        duration_min: u32,
        break_type: BreakType,
        activities: ActivityFlags,
        ledger: &DebtLedger,
    ) -> Result<ClearancePreview, ValidationError> {
        let clearance = self.calculate(duration_min, break_type, activities, ledger)?;
        let before = ledger.total();
        Ok(ClearancePreview {
            clearance,
            total_debt_before: before,
            total_debt_after: before.saturating_sub(clearance.total()),
        })
    }

    /// Calculate, apply to the ledger, and bump stats. Rejections leave
    /// ledger and stats untouched.
    pub fn apply(
        &self,
        duration_min: u32,
        break_type: BreakType,
        activities: ActivityFlags,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
        now: DateTime<Utc>,
    ) -> Result<BreakLog, ValidationError> {
        let clearance = self.calculate(duration_min, break_type, activities, ledger)?;

        for category in DebtCategory::WELLNESS {
            let amount = clearance.get(category);
            if amount > 0 {
                ledger.apply(category, -i64::from(amount));
            }
        }
        stats.breaks_taken += 1;
        stats.debts_cleared += u64::from(clearance.total());

        tracing::info!(
            minutes = duration_min,
            ?break_type,
            cleared = clearance.total(),
            remaining_debt = ledger.total(),
            "break logged"
        );

        Ok(BreakLog {
            id: Uuid::new_v4().to_string(),
            break_type,
            duration_min,
            activities,
            clearance,
            timestamp: now,
        })
    }
}
