//! Persisted form of a live session timer.
//!
//! Written at least once per second while a block is active. On load it is
//! checked against the active block before anything trusts it; a snapshot
//! that fails the check is discarded by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::TimerState;
use crate::block::Block;
use crate::protocol::ProtocolStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimerState {
    pub block_id: String,
    /// Seconds.
    pub total_time: u64,
    /// Seconds.
    pub time_remaining: u64,
    /// Seconds actually spent, including gaps absorbed on resume.
    #[serde(default)]
    pub actual_time_spent: u64,
    pub state: TimerState,
    /// Mirrors `state`; kept for readers that only look at the flags.
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub block_start_time: Option<DateTime<Utc>>,
    pub last_snapshot_time: DateTime<Utc>,
    #[serde(default)]
    pub protocol_statuses: Vec<ProtocolStatus>,
    /// Protocol awaiting a response, when `state` is `protocol_prompt`.
    #[serde(default)]
    pub prompt: Option<u32>,
}

/// Why a snapshot could not be resumed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SnapshotMismatch(pub String);

impl SessionTimerState {
    /// Check the snapshot belongs to `block` and is internally consistent.
    pub fn validate_for(&self, block: &Block) -> Result<(), SnapshotMismatch> {
        if self.block_id != block.id {
            return Err(SnapshotMismatch(format!(
                "snapshot block {} does not match active block {}",
                self.block_id, block.id
            )));
        }
        if block.completed || self.state == TimerState::Completed {
            return Err(SnapshotMismatch("block already completed".into()));
        }
        if self.total_time != block.total_secs() {
            return Err(SnapshotMismatch(format!(
                "total time {}s does not match block duration {}s",
                self.total_time,
                block.total_secs()
            )));
        }
        if self.time_remaining > self.total_time {
            return Err(SnapshotMismatch("remaining time exceeds total".into()));
        }
        if self.protocol_statuses.len() != block.protocols.len() {
            return Err(SnapshotMismatch(format!(
                "{} protocol statuses for {} protocols",
                self.protocol_statuses.len(),
                block.protocols.len()
            )));
        }
        match (self.state, self.prompt) {
            (TimerState::ProtocolPrompt, Some(id)) => {
                let status = self.protocol_statuses.get(id as usize);
                if status != Some(&ProtocolStatus::Triggered) {
                    return Err(SnapshotMismatch(format!(
                        "prompted protocol {id} is not awaiting a response"
                    )));
                }
            }
            (TimerState::ProtocolPrompt, None) => {
                return Err(SnapshotMismatch("prompt state without a protocol".into()));
            }
            _ => {}
        }
        Ok(())
    }
}
