//! Lifetime counters and the review metrics derived from them.
//!
//! Counters only ever grow. They are written by block finalize and by break
//! logging; everything else reads them.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::breaks::BreakLog;
use crate::protocol::TemplateTier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub blocks_completed: u64,
    #[serde(default)]
    pub protocols_completed: u64,
    #[serde(default)]
    pub protocols_skipped: u64,
    #[serde(default)]
    pub breaks_taken: u64,
    /// Minutes.
    #[serde(default)]
    pub total_focus_time: u64,
    #[serde(default)]
    pub debts_created: u64,
    #[serde(default)]
    pub debts_cleared: u64,
    /// Blocks that ended with total debt at or above the fatigue threshold.
    #[serde(default)]
    pub fatigue_flags: u64,
}

/// Read-only metrics shown on the review screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    #[serde(flatten)]
    pub counters: Stats,
    pub compliance_rate_pct: u32,
    pub compliance_trend: ComplianceTrend,
    pub net_debt: i64,
    pub average_block_min: u64,
    pub average_break_min: u64,
    pub block_distribution: BlockDistribution,
    /// Size bucket with the most completed blocks; shorter wins a tie.
    pub best_block_size: Option<TemplateTier>,
}

/// Completed blocks by planned length: up to 25, up to 50, longer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDistribution {
    pub short: u64,
    pub standard: u64,
    pub extended: u64,
}

impl BlockDistribution {
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let mut dist = Self::default();
        for block in blocks.iter().filter(|b| b.completed) {
            match TemplateTier::for_duration(block.duration_min) {
                TemplateTier::Short => dist.short += 1,
                TemplateTier::Standard => dist.standard += 1,
                TemplateTier::Extended => dist.extended += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> u64 {
        self.short + self.standard + self.extended
    }

    pub fn best(&self) -> Option<TemplateTier> {
        if self.total() == 0 {
            return None;
        }
        let max = self.short.max(self.standard).max(self.extended);
        if self.short == max {
            Some(TemplateTier::Short)
        } else if self.standard == max {
            Some(TemplateTier::Standard)
        } else {
            Some(TemplateTier::Extended)
        }
    }
}

/// Protocol compliance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceTrend {
    Excellent,
    Good,
    NeedsImprovement,
    Critical,
}

impl ComplianceTrend {
    /// Band for a completed/resolved ratio in `0.0..=1.0`.
    pub fn for_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            ComplianceTrend::Excellent
        } else if ratio >= 0.7 {
            ComplianceTrend::Good
        } else if ratio >= 0.5 {
            ComplianceTrend::NeedsImprovement
        } else {
            ComplianceTrend::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ComplianceTrend::Excellent => "Excellent",
            ComplianceTrend::Good => "Good",
            ComplianceTrend::NeedsImprovement => "Needs Improvement",
            ComplianceTrend::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for ComplianceTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Stats {
    /// Share of resolved protocols that were completed, rounded percent.
    /// 100 before anything has resolved.
    pub fn compliance_rate_pct(&self) -> u32 {
        let resolved = self.protocols_completed + self.protocols_skipped;
        if resolved == 0 {
            return 100;
        }
        ((self.protocols_completed as f64 / resolved as f64) * 100.0).round() as u32
    }

    pub fn net_debt(&self) -> i64 {
        self.debts_created as i64 - self.debts_cleared as i64
    }

    /// Rounded mean focus minutes per completed block.
    pub fn average_block_min(&self) -> u64 {
        if self.blocks_completed == 0 {
            return 0;
        }
        ((self.total_focus_time as f64) / (self.blocks_completed as f64)).round() as u64
    }

    /// Banding uses the raw ratio, which is 0 before anything has resolved.
    pub fn compliance_trend(&self) -> ComplianceTrend {
        let resolved = (self.protocols_completed + self.protocols_skipped).max(1);
        ComplianceTrend::for_ratio(self.protocols_completed as f64 / resolved as f64)
    }

    pub fn summary(&self, blocks: &[Block], breaks: &[BreakLog]) -> StatsSummary {
        let block_distribution = BlockDistribution::from_blocks(blocks);
        StatsSummary {
            counters: self.clone(),
            compliance_rate_pct: self.compliance_rate_pct(),
            compliance_trend: self.compliance_trend(),
            net_debt: self.net_debt(),
            average_block_min: self.average_block_min(),
            average_break_min: average_break_min(breaks),
            best_block_size: block_distribution.best(),
            block_distribution,
        }
    }
}

/// Rounded mean length of logged breaks, 0 when none.
pub fn average_break_min(breaks: &[BreakLog]) -> u64 {
    if breaks.is_empty() {
        return 0;
    }
    let total: u64 = breaks.iter().map(|b| u64::from(b.duration_min)).sum();
    (total as f64 / breaks.len() as f64).round() as u64
}
