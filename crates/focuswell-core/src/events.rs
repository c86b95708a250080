use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::block::{Block, CompletionData};
use crate::breaks::BreakLog;
use crate::debt::DebtCategory;
use crate::protocol::ProtocolStatus;
use crate::timer::TimerState;

/// Every state change in the engine produces an Event.
/// The display layer prints or polls them; nothing in the core consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BlockCreated {
        block: Block,
        at: DateTime<Utc>,
    },
    BlockActivated {
        block_id: String,
        at: DateTime<Utc>,
    },
    BlockDeleted {
        block_id: String,
        at: DateTime<Utc>,
    },
    TimerStarted {
        block_id: String,
        remaining_secs: u64,
        /// False on the very first start of the block.
        resumed: bool,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Elapsed wall-clock time absorbed after a reload or a stalled tick source.
    TimerCaughtUp {
        gap_secs: u64,
        consumed_secs: u64,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ProtocolTriggered {
        protocol_id: u32,
        category: DebtCategory,
        trigger_minute: u32,
        at: DateTime<Utc>,
    },
    /// Timer is held until the user completes or skips this protocol.
    ProtocolPrompted {
        protocol_id: u32,
        name: String,
        category: DebtCategory,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    ProtocolResolved {
        protocol_id: u32,
        status: ProtocolStatus,
        at: DateTime<Utc>,
    },
    BlockFinalized {
        block_id: String,
        completion: CompletionData,
        at: DateTime<Utc>,
    },
    BreakLogged {
        log: BreakLog,
    },
    StateSnapshot {
        block_id: String,
        state: TimerState,
        remaining_secs: u64,
        total_secs: u64,
        actual_secs: u64,
        progress_pct: f64,
        prompt: Option<u32>,
        at: DateTime<Utc>,
    },
}
