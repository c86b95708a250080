//! Session timer state machine.
//!
//! One `SessionTimer` exists per active block and is dropped once the block
//! finalizes. It has no internal thread: the caller invokes `tick()` once per
//! elapsed second while running, and passes the current wall-clock time into
//! every command.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |  ^
//!           v  |
//!       ProtocolPrompt
//!
//! (any non-terminal) -> Completed   via stop() or countdown reaching zero
//! ```
//!
//! `Triggered` protocol status is computed here, once per tick or replay, and
//! nowhere else.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::reconcile::apply_completion;
use super::snapshot::{SessionTimerState, SnapshotMismatch};
use crate::block::{Block, CompletionData};
use crate::clock::whole_secs_between;
use crate::debt::{DebtCategory, DebtLedger};
use crate::error::ValidationError;
use crate::events::Event;
use crate::protocol::{Protocol, ProtocolOutcome, ProtocolStatus};
use crate::stats::Stats;

/// Remaining planned minutes per unit of early-termination debt.
const EARLY_TERMINATION_MINUTES_PER_DEBT: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    /// Implicit pause while a triggered protocol waits for a response.
    ProtocolPrompt,
    Completed,
}

/// A protocol paired with its live status, for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolView {
    #[serde(flatten)]
    pub protocol: Protocol,
    pub status: ProtocolStatus,
}

#[derive(Debug, Clone)]
pub struct SessionTimer {
    block_id: String,
    planned_min: u32,
    protocols: Vec<Protocol>,
    statuses: Vec<ProtocolStatus>,
    state: TimerState,
    total_secs: u64,
    remaining_secs: u64,
    actual_secs: u64,
    block_start: Option<DateTime<Utc>>,
    /// Instant elapsed time is accounted up to while running.
    last_synced_at: Option<DateTime<Utc>>,
    prompt: Option<u32>,
    completion: Option<CompletionData>,
}

impl SessionTimer {
    /// Fresh timer for a block that has not started.
    pub fn new(block: &Block) -> Self {
        Self {
            block_id: block.id.clone(),
            planned_min: block.duration_min,
            protocols: block.protocols.clone(),
            statuses: vec![ProtocolStatus::Pending; block.protocols.len()],
            state: TimerState::Idle,
            total_secs: block.total_secs(),
            remaining_secs: block.total_secs(),
            actual_secs: 0,
            block_start: None,
            last_synced_at: None,
            prompt: None,
            completion: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn actual_secs(&self) -> u64 {
        self.actual_secs
    }

    /// Countdown position: seconds consumed from the planned duration.
    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }

    pub fn block_start(&self) -> Option<DateTime<Utc>> {
        self.block_start
    }

    /// Protocol currently awaiting a response.
    pub fn prompt(&self) -> Option<&Protocol> {
        self.prompt.and_then(|id| self.protocols.get(id as usize))
    }

    pub fn status_of(&self, protocol_id: u32) -> Option<ProtocolStatus> {
        self.statuses.get(protocol_id as usize).copied()
    }

    pub fn protocols(&self) -> Vec<ProtocolView> {
        self.protocols
            .iter()
            .zip(self.statuses.iter())
            .map(|(p, s)| ProtocolView {
                protocol: p.clone(),
                status: *s,
            })
            .collect()
    }

    pub fn completion(&self) -> Option<&CompletionData> {
        self.completion.as_ref()
    }

    /// 0.0 .. 100.0 progress through the planned duration.
    pub fn progress_pct(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        (self.elapsed_secs() as f64 / self.total_secs as f64 * 100.0).min(100.0)
    }

    pub fn status_event(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            block_id: self.block_id.clone(),
            state: self.state,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            actual_secs: self.actual_secs,
            progress_pct: self.progress_pct(),
            prompt: self.prompt,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.state {
            TimerState::Idle | TimerState::Paused => {
                let resumed = self.block_start.is_some();
                if self.block_start.is_none() {
                    self.block_start = Some(now);
                }
                self.state = TimerState::Running;
                self.last_synced_at = Some(now);
                Some(Event::TimerStarted {
                    block_id: self.block_id.clone(),
                    remaining_secs: self.remaining_secs,
                    resumed,
                    at: now,
                })
            }
            TimerState::Running | TimerState::ProtocolPrompt | TimerState::Completed => None,
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        self.state = TimerState::Paused;
        self.last_synced_at = Some(now);
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// One elapsed second. No-op unless running.
    pub fn tick(
        &mut self,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        self.last_synced_at = Some(now);
        self.step(now, ledger, stats)
    }

    /// Account for the whole seconds of wall-clock time since the last sync.
    ///
    /// Gaps up to `threshold_secs` are counted one second at a time, so a
    /// prompt that opens mid-gap holds the countdown. Longer gaps are caught
    /// up in one go. The sub-second remainder carries over to the next call,
    /// so polling at any rate counts each elapsed second exactly once.
    pub fn advance(
        &mut self,
        now: DateTime<Utc>,
        threshold_secs: u64,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let Some(last) = self.last_synced_at else {
            return Vec::new();
        };
        let gap = whole_secs_between(last, now);
        if gap == 0 {
            return Vec::new();
        }
        if gap > threshold_secs {
            return self.catch_up(gap, now, ledger, stats);
        }

        let mut events = Vec::new();
        for _ in 0..gap {
            if self.state != TimerState::Running {
                break;
            }
            events.extend(self.step(now, ledger, stats));
        }
        self.last_synced_at = if self.state == TimerState::Running {
            Some(last + Duration::seconds(gap as i64))
        } else {
            Some(now)
        };
        events
    }

    /// Complete or skip the prompted protocol.
    ///
    /// Unknown ids and not-yet-triggered protocols are rejected. Resolved
    /// protocols, and triggered ones that are not the current prompt, are
    /// left alone.
    pub fn respond(
        &mut self,
        protocol_id: u32,
        outcome: ProtocolOutcome,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, ValidationError> {
        let status = self
            .status_of(protocol_id)
            .ok_or(ValidationError::UnknownProtocol(protocol_id))?;
        if status == ProtocolStatus::Pending {
            return Err(ValidationError::ProtocolNotTriggered(protocol_id));
        }
        if status.is_resolved()
            || self.state != TimerState::ProtocolPrompt
            || self.prompt != Some(protocol_id)
        {
            return Ok(Vec::new());
        }

        let resolved = match outcome {
            ProtocolOutcome::Complete => ProtocolStatus::Completed,
            ProtocolOutcome::Skip => ProtocolStatus::Skipped,
        };
        self.statuses[protocol_id as usize] = resolved;
        self.prompt = None;
        self.state = TimerState::Running;
        self.last_synced_at = Some(now);

        let mut events = vec![Event::ProtocolResolved {
            protocol_id,
            status: resolved,
            at: now,
        }];
        events.extend(self.open_prompt(now));
        Ok(events)
    }

    /// User-forced early end.
    pub fn stop(
        &mut self,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Option<Event> {
        self.finalize(now, ledger, stats)
    }

    /// Close the block: force-skip everything unresolved, charge skips and
    /// the early-termination penalty, update stats.
    ///
    /// Returns `None` (and changes nothing) if already completed.
    pub fn finalize(
        &mut self,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Option<Event> {
        if self.state == TimerState::Completed {
            return None;
        }

        let mut completed = 0u32;
        let mut skipped = 0u32;
        let mut debt_changes: BTreeMap<DebtCategory, u32> = BTreeMap::new();
        for (protocol, status) in self.protocols.iter().zip(self.statuses.iter_mut()) {
            if *status == ProtocolStatus::Completed {
                completed += 1;
                continue;
            }
            *status = ProtocolStatus::Skipped;
            skipped += 1;
            *debt_changes.entry(protocol.category).or_insert(0) += 1;
        }

        let actual_minutes = self.actual_secs / 60;
        let remaining_minutes = u64::from(self.planned_min).saturating_sub(actual_minutes);
        let early_termination_debt = remaining_minutes / EARLY_TERMINATION_MINUTES_PER_DEBT;
        for i in 0..early_termination_debt {
            let slot = i % DebtCategory::WELLNESS.len() as u64;
            let category = DebtCategory::WELLNESS[slot as usize];
            *debt_changes.entry(category).or_insert(0) += 1;
        }

        let completion = CompletionData {
            completed,
            skipped,
            debt_changes,
            actual_minutes,
            planned_minutes: self.planned_min,
            remaining_minutes,
            early_termination_debt,
            completed_at: now,
        };
        apply_completion(&completion, ledger, stats);

        self.state = TimerState::Completed;
        self.prompt = None;
        self.last_synced_at = Some(now);
        self.completion = Some(completion.clone());

        tracing::info!(
            block_id = %self.block_id,
            completed,
            skipped,
            actual_minutes,
            early_termination_debt,
            total_debt = ledger.total(),
            "block finalized"
        );

        Some(Event::BlockFinalized {
            block_id: self.block_id.clone(),
            completion,
            at: now,
        })
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Capture state for persistence.
    ///
    /// While running, the snapshot time is the instant elapsed time was last
    /// accounted up to, so taking a snapshot never drops unaccounted time.
    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionTimerState {
        let synced_at = match self.state {
            TimerState::Running => self.last_synced_at.unwrap_or(now),
            _ => now,
        };
        SessionTimerState {
            block_id: self.block_id.clone(),
            total_time: self.total_secs,
            time_remaining: self.remaining_secs,
            actual_time_spent: self.actual_secs,
            state: self.state,
            running: self.state == TimerState::Running,
            paused: matches!(self.state, TimerState::Paused | TimerState::ProtocolPrompt),
            block_start_time: self.block_start,
            last_snapshot_time: synced_at,
            protocol_statuses: self.statuses.clone(),
            prompt: self.prompt,
        }
    }

    /// Rebuild a timer from a persisted snapshot.
    ///
    /// A running snapshot absorbs the wall-clock gap since it was written,
    /// which may trigger protocols retroactively or finalize the block.
    /// Paused, prompted and idle snapshots come back verbatim.
    pub fn restore(
        block: &Block,
        saved: &SessionTimerState,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Result<(Self, Vec<Event>), SnapshotMismatch> {
        saved.validate_for(block)?;

        let mut timer = Self::new(block);
        timer.statuses = saved.protocol_statuses.clone();
        timer.state = saved.state;
        timer.remaining_secs = saved.time_remaining;
        timer.actual_secs = saved.actual_time_spent;
        timer.block_start = saved.block_start_time;
        timer.prompt = match saved.state {
            TimerState::ProtocolPrompt => saved.prompt,
            _ => None,
        };
        timer.last_synced_at = Some(saved.last_snapshot_time);

        let gap = whole_secs_between(saved.last_snapshot_time, now);
        let events = match timer.state {
            TimerState::Running if gap > 0 => timer.catch_up(gap, now, ledger, stats),
            TimerState::Running => Vec::new(),
            _ => {
                timer.last_synced_at = Some(now);
                Vec::new()
            }
        };
        Ok((timer, events))
    }

    /// Correct for a stalled tick source. Only acts while running and when
    /// the unaccounted gap exceeds `threshold_secs`.
    pub fn resync(
        &mut self,
        now: DateTime<Utc>,
        threshold_secs: u64,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Vec<Event> {
        if self.state != TimerState::Running {
            return Vec::new();
        }
        let Some(last) = self.last_synced_at else {
            return Vec::new();
        };
        let gap = whole_secs_between(last, now);
        if gap <= threshold_secs {
            return Vec::new();
        }
        self.catch_up(gap, now, ledger, stats)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Count one second while running.
    fn step(
        &mut self,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Vec<Event> {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.actual_secs = self.actual_secs.saturating_add(1);

        if self.remaining_secs == 0 {
            return self.finalize(now, ledger, stats).into_iter().collect();
        }
        self.evaluate_triggers(now)
    }

    fn catch_up(
        &mut self,
        gap_secs: u64,
        now: DateTime<Utc>,
        ledger: &mut DebtLedger,
        stats: &mut Stats,
    ) -> Vec<Event> {
        let consumed = gap_secs.min(self.remaining_secs);
        self.remaining_secs -= consumed;
        self.actual_secs = self.actual_secs.saturating_add(gap_secs);
        self.last_synced_at = Some(
            self.last_synced_at
                .map_or(now, |last| last + Duration::seconds(gap_secs as i64)),
        );

        let mut events = vec![Event::TimerCaughtUp {
            gap_secs,
            consumed_secs: consumed,
            remaining_secs: self.remaining_secs,
            at: now,
        }];
        if self.remaining_secs == 0 {
            events.extend(self.mark_due(now));
            events.extend(self.finalize(now, ledger, stats));
        } else {
            events.extend(self.evaluate_triggers(now));
        }
        events
    }

    /// Flip every due `Pending` protocol to `Triggered`.
    fn mark_due(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let elapsed = self.elapsed_secs();
        let mut events = Vec::new();
        for (protocol, status) in self.protocols.iter().zip(self.statuses.iter_mut()) {
            if *status == ProtocolStatus::Pending && protocol.trigger_secs() <= elapsed {
                *status = ProtocolStatus::Triggered;
                tracing::debug!(
                    protocol_id = protocol.id,
                    category = %protocol.category,
                    "protocol triggered"
                );
                events.push(Event::ProtocolTriggered {
                    protocol_id: protocol.id,
                    category: protocol.category,
                    trigger_minute: protocol.trigger_minute,
                    at: now,
                });
            }
        }
        events
    }

    fn evaluate_triggers(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let mut events = self.mark_due(now);
        events.extend(self.open_prompt(now));
        events
    }

    /// Hold the timer on the earliest triggered, unresolved protocol.
    /// Protocols are stored in schedule order, so the first match wins.
    fn open_prompt(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != TimerState::Running {
            return None;
        }
        let idx = self
            .statuses
            .iter()
            .position(|s| *s == ProtocolStatus::Triggered)?;
        let protocol = &self.protocols[idx];
        self.state = TimerState::ProtocolPrompt;
        self.prompt = Some(protocol.id);
        Some(Event::ProtocolPrompted {
            protocol_id: protocol.id,
            name: protocol.name.clone(),
            category: protocol.category,
            duration_secs: protocol.duration_secs,
            at: now,
        })
    }
}
