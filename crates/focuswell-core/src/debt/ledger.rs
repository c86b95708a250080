use std::fmt;

use serde::{Deserialize, Serialize};

/// Wellness category a debt unit belongs to.
///
/// The four wellness categories are the only ones protocols, penalties and
/// breaks ever touch. `TimeDebt` is an auxiliary bucket: it counts toward the
/// total but nothing in the engine writes to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebtCategory {
    Eye,
    Hydration,
    Mobility,
    Posture,
    TimeDebt,
}

impl DebtCategory {
    /// Wellness categories in priority order. Used for schedule tie-breaks
    /// and for round-robin penalty distribution.
    pub const WELLNESS: [DebtCategory; 4] = [
        DebtCategory::Eye,
        DebtCategory::Hydration,
        DebtCategory::Mobility,
        DebtCategory::Posture,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DebtCategory::Eye => "eye",
            DebtCategory::Hydration => "hydration",
            DebtCategory::Mobility => "mobility",
            DebtCategory::Posture => "posture",
            DebtCategory::TimeDebt => "timeDebt",
        }
    }

    /// Position in the tie-break order (lower wins).
    pub fn priority(self) -> u8 {
        match self {
            DebtCategory::Eye => 0,
            DebtCategory::Hydration => 1,
            DebtCategory::Mobility => 2,
            DebtCategory::Posture => 3,
            DebtCategory::TimeDebt => 4,
        }
    }
}

impl fmt::Display for DebtCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-category debt counters.
///
/// Values are unsigned so they can never go negative; [`DebtLedger::apply`]
/// is the only write path and clamps at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtLedger {
    #[serde(default)]
    eye: u32,
    #[serde(default)]
    hydration: u32,
    #[serde(default)]
    mobility: u32,
    #[serde(default)]
    posture: u32,
    #[serde(default)]
    time_debt: u32,
}

impl DebtLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: DebtCategory) -> u32 {
        match category {
            DebtCategory::Eye => self.eye,
            DebtCategory::Hydration => self.hydration,
            DebtCategory::Mobility => self.mobility,
            DebtCategory::Posture => self.posture,
            DebtCategory::TimeDebt => self.time_debt,
        }
    }

    /// Sum of every category, `timeDebt` included.
    pub fn total(&self) -> u32 {
        [self.eye, self.hydration, self.mobility, self.posture, self.time_debt]
            .iter()
            .fold(0u32, |acc, v| acc.saturating_add(*v))
    }

    /// Add a signed delta to one category and return the new value.
    ///
    /// The result is clamped to `0..=u32::MAX`; this never fails.
    pub fn apply(&mut self, category: DebtCategory, delta: i64) -> u32 {
        let slot = self.slot_mut(category);
        let next = (*slot as i64).saturating_add(delta).clamp(0, u32::MAX as i64);
        *slot = next as u32;
        *slot
    }

    /// Iterate `(category, value)` over every bucket.
    pub fn entries(&self) -> impl Iterator<Item = (DebtCategory, u32)> + '_ {
        DebtCategory::WELLNESS
            .iter()
            .copied()
            .chain(std::iter::once(DebtCategory::TimeDebt))
            .map(move |c| (c, self.get(c)))
    }

    fn slot_mut(&mut self, category: DebtCategory) -> &mut u32 {
        match category {
            DebtCategory::Eye => &mut self.eye,
            DebtCategory::Hydration => &mut self.hydration,
            DebtCategory::Mobility => &mut self.mobility,
            DebtCategory::Posture => &mut self.posture,
            DebtCategory::TimeDebt => &mut self.time_debt,
        }
    }
}
