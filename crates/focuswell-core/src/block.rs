//! Planned focus blocks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::debt::DebtCategory;
use crate::protocol::{Protocol, ProtocolConfig};

/// A planned focus session with its immutable protocol schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub duration_min: u32,
    pub category_label: String,
    #[serde(default)]
    pub notes: String,
    pub protocols: Vec<Protocol>,
    /// Generation settings; `None` for template schedules.
    #[serde(default)]
    pub protocol_config: Option<ProtocolConfig>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completion: Option<CompletionData>,
    pub created_at: DateTime<Utc>,
}

impl Block {
    pub fn new(
        duration_min: u32,
        category_label: impl Into<String>,
        notes: impl Into<String>,
        protocols: Vec<Protocol>,
        protocol_config: Option<ProtocolConfig>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            duration_min,
            category_label: category_label.into(),
            notes: notes.into(),
            protocols,
            protocol_config,
            completed: false,
            completion: None,
            created_at,
        }
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.duration_min) * 60
    }
}

/// Input for block creation. `protocol_config: None` selects template mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub duration_min: u32,
    pub category_label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub protocol_config: Option<ProtocolConfig>,
}

/// Outcome of a finalized block, stored on the block and emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    pub completed: u32,
    pub skipped: u32,
    /// Debt added per category by this block (skips plus penalty).
    #[serde(default)]
    pub debt_changes: BTreeMap<DebtCategory, u32>,
    pub actual_minutes: u64,
    pub planned_minutes: u32,
    pub remaining_minutes: u64,
    pub early_termination_debt: u64,
    pub completed_at: DateTime<Utc>,
}

impl CompletionData {
    /// Debt this block created: one per skipped protocol plus the penalty.
    pub fn debt_added(&self) -> u64 {
        u64::from(self.skipped) + self.early_termination_debt
    }
}
