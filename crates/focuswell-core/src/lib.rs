//! # Focuswell Core Library
//!
//! Core logic for Focuswell, a focus-block planner that tracks the recovery
//! debt built up by skipping wellness protocols during long sessions. The
//! `focuswell` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Debt**: per-category ledger plus the conservative-mode policy that
//!   caps block length as debt grows
//! - **Protocols**: scheduler producing the wellness prompts inside a block
//! - **Timer**: a wall-clock state machine that requires the caller to invoke
//!   `tick()` once per second; resumable from persisted snapshots
//! - **Breaks**: the only way to clear debt
//! - **Storage**: SQLite key/value records and TOML configuration
//!
//! ## Key Components
//!
//! - [`FocusEngine`]: owns all state and exposes every operation
//! - [`SessionTimer`]: countdown and protocol prompt state machine
//! - [`Database`]: SQLite-backed [`KvStore`]
//! - [`Config`]: application configuration management

pub mod block;
pub mod breaks;
pub mod clock;
pub mod debt;
pub mod engine;
pub mod error;
pub mod events;
pub mod protocol;
pub mod stats;
pub mod storage;
pub mod timer;

pub use block::{Block, BlockRequest, CompletionData};
pub use breaks::{
    ActivityFlags, BreakClearanceCalculator, BreakLog, BreakType, Clearance, ClearancePreview,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use debt::{ConservativeModePolicy, DebtCategory, DebtLedger, RiskLevel};
pub use engine::FocusEngine;
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use protocol::{
    CategorySchedule, Protocol, ProtocolConfig, ProtocolOutcome, ProtocolScheduler, ProtocolStatus,
    TemplateTier,
};
pub use stats::{BlockDistribution, ComplianceTrend, Stats, StatsSummary};
pub use storage::{Config, Database, KvStore, MemoryStore};
pub use timer::{ProtocolView, SessionTimer, SessionTimerState, TimerState};
