//! Folding a finalized block's outcome into the ledger and stats.

use crate::block::CompletionData;
use crate::debt::DebtLedger;
use crate::stats::Stats;

/// Total debt at or above this after a block raises a fatigue flag.
pub const FATIGUE_THRESHOLD: u32 = 5;

/// Apply one block's debt and counters. Call exactly once per completion;
/// [`super::SessionTimer`] only ever hands out a completion once.
pub fn apply_completion(completion: &CompletionData, ledger: &mut DebtLedger, stats: &mut Stats) {
    for (category, units) in &completion.debt_changes {
        ledger.apply(*category, i64::from(*units));
    }

    stats.blocks_completed += 1;
    stats.total_focus_time += completion.actual_minutes;
    stats.protocols_completed += u64::from(completion.completed);
    stats.protocols_skipped += u64::from(completion.skipped);
    stats.debts_created += completion.debt_added();

    if ledger.total() >= FATIGUE_THRESHOLD {
        stats.fatigue_flags += 1;
        tracing::warn!(total_debt = ledger.total(), "fatigue flag raised");
    }
}
