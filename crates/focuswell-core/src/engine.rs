//! Engine facade.
//!
//! [`FocusEngine`] is the single owner of the debt ledger, stats, block list,
//! break log and the live [`SessionTimer`]. Every mutation goes through
//! `&mut self` and is followed by a best-effort write of all records, so a
//! validation failure never reaches the store and a storage failure never
//! fails the user operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::block::{Block, BlockRequest};
use crate::breaks::{ActivityFlags, BreakClearanceCalculator, BreakLog, BreakType, ClearancePreview};
use crate::clock::Clock;
use crate::debt::{ConservativeModePolicy, DebtLedger, RiskLevel};
use crate::error::ValidationError;
use crate::events::Event;
use crate::protocol::{ProtocolOutcome, ProtocolScheduler};
use crate::stats::{Stats, StatsSummary};
use crate::storage::records::{self, ACTIVE_BLOCK, BLOCKS, BREAKS, DEBT_LEDGER, STATS, TIMER_STATE};
use crate::storage::{Config, KvStore};
use crate::timer::{ProtocolView, SessionTimer, SessionTimerState, TimerState};

pub struct FocusEngine {
    store: Box<dyn KvStore>,
    clock: Arc<dyn Clock>,
    config: Config,
    policy: ConservativeModePolicy,
    calculator: BreakClearanceCalculator,
    ledger: DebtLedger,
    stats: Stats,
    blocks: Vec<Block>,
    breaks: Vec<BreakLog>,
    timer: Option<SessionTimer>,
    startup_events: Vec<Event>,
}

impl FocusEngine {
    /// Load every record from `store` and resume the active block, if any.
    ///
    /// Never fails: unusable records are replaced by defaults. A running
    /// timer absorbs the time elapsed since its last snapshot, which may
    /// trigger protocols or finalize the block; the resulting events are
    /// available from [`FocusEngine::take_startup_events`].
    pub fn open(store: Box<dyn KvStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        let store_ref: &dyn KvStore = store.as_ref();
        let ledger: DebtLedger = records::load_or_default(store_ref, DEBT_LEDGER);
        let stats: Stats = records::load_or_default(store_ref, STATS);
        let blocks: Vec<Block> = records::load_or_default(store_ref, BLOCKS);
        let breaks: Vec<BreakLog> = records::load_or_default(store_ref, BREAKS);
        let active_id: Option<String> = records::load(store_ref, ACTIVE_BLOCK);
        let saved: Option<SessionTimerState> = records::load(store_ref, TIMER_STATE);

        let mut engine = Self {
            store,
            clock,
            calculator: BreakClearanceCalculator::with_min_duration(config.breaks.min_duration_min),
            config,
            policy: ConservativeModePolicy::new(),
            ledger,
            stats,
            blocks,
            breaks,
            timer: None,
            startup_events: Vec::new(),
        };
        engine.resume(active_id, saved);
        engine.persist();
        engine
    }

    fn resume(&mut self, active_id: Option<String>, saved: Option<SessionTimerState>) {
        let Some(active_id) = active_id else {
            return;
        };
        let Some(block) = self.blocks.iter().find(|b| b.id == active_id).cloned() else {
            tracing::warn!(block_id = %active_id, "active block no longer exists, clearing");
            return;
        };
        if block.completed {
            tracing::warn!(block_id = %active_id, "active block already completed, clearing");
            return;
        }

        let now = self.clock.now();
        let restored = saved.map(|saved| {
            SessionTimer::restore(&block, &saved, now, &mut self.ledger, &mut self.stats)
        });
        let timer = match restored {
            Some(Ok((timer, events))) => {
                tracing::debug!(
                    block_id = %block.id,
                    state = ?timer.state(),
                    remaining_secs = timer.remaining_secs(),
                    "session resumed"
                );
                self.startup_events = events;
                timer
            }
            Some(Err(mismatch)) => {
                tracing::warn!(block_id = %block.id, %mismatch, "discarding timer snapshot");
                SessionTimer::new(&block)
            }
            None => SessionTimer::new(&block),
        };
        self.timer = Some(timer);
        self.settle_timer();
    }

    /// Events produced while resuming in [`FocusEngine::open`].
    pub fn take_startup_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.startup_events)
    }

    // ── Blocks ───────────────────────────────────────────────────────

    /// Validate and store a new block.
    ///
    /// Checks run in order: duration bounds and the conservative limit
    /// against the live ledger, category label, protocol intervals, then the
    /// generated schedule must be non-empty.
    pub fn create_block(&mut self, request: BlockRequest) -> Result<Event, ValidationError> {
        self.policy
            .validate_duration(request.duration_min, self.ledger.total())?;

        let label = request.category_label.trim();
        if label.is_empty() {
            return Err(ValidationError::EmptyCategoryLabel);
        }

        let protocols = match &request.protocol_config {
            Some(config) => {
                config.validate()?;
                ProtocolScheduler::configured(request.duration_min, config)
            }
            None => ProtocolScheduler::template(request.duration_min),
        };
        if protocols.is_empty() {
            return Err(ValidationError::EmptyProtocolSchedule);
        }

        let now = self.clock.now();
        let block = Block::new(
            request.duration_min,
            label,
            request.notes.trim(),
            protocols,
            request.protocol_config,
            now,
        );
        tracing::info!(
            block_id = %block.id,
            duration_min = block.duration_min,
            protocols = block.protocols.len(),
            "block created"
        );
        self.blocks.push(block.clone());
        self.persist();
        Ok(Event::BlockCreated { block, at: now })
    }

    /// Make `block_id` the active block with an idle timer.
    ///
    /// An active block whose timer never started is replaced. One that has
    /// started must be stopped first.
    pub fn activate_block(&mut self, block_id: &str) -> Result<Event, ValidationError> {
        let block = self
            .blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or_else(|| ValidationError::UnknownBlock(block_id.to_string()))?;
        if block.completed {
            return Err(ValidationError::BlockAlreadyCompleted(block_id.to_string()));
        }

        if let Some(timer) = &self.timer {
            if timer.block_start().is_some() {
                return Err(ValidationError::BlockInProgress(timer.block_id().to_string()));
            }
            if timer.block_id() != block_id {
                tracing::debug!(replaced = %timer.block_id(), "replacing idle active block");
            }
        }

        let now = self.clock.now();
        self.timer = Some(SessionTimer::new(block));
        tracing::info!(block_id, "block activated");
        self.persist();
        Ok(Event::BlockActivated {
            block_id: block_id.to_string(),
            at: now,
        })
    }

    /// Remove a block. The active block cannot be deleted.
    pub fn delete_block(&mut self, block_id: &str) -> Result<Event, ValidationError> {
        let idx = self
            .blocks
            .iter()
            .position(|b| b.id == block_id)
            .ok_or_else(|| ValidationError::UnknownBlock(block_id.to_string()))?;
        if self.active_block_id() == Some(block_id) {
            return Err(ValidationError::BlockInProgress(block_id.to_string()));
        }
        self.blocks.remove(idx);
        tracing::info!(block_id, "block deleted");
        self.persist();
        Ok(Event::BlockDeleted {
            block_id: block_id.to_string(),
            at: self.clock.now(),
        })
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start_timer(&mut self) -> Result<Option<Event>, ValidationError> {
        let now = self.clock.now();
        let event = self.timer_mut()?.start(now);
        self.persist();
        Ok(event)
    }

    pub fn pause_timer(&mut self) -> Result<Option<Event>, ValidationError> {
        let now = self.clock.now();
        let event = self.timer_mut()?.pause(now);
        self.persist();
        Ok(event)
    }

    /// End the active block early and reconcile it.
    pub fn stop_timer(&mut self) -> Result<Option<Event>, ValidationError> {
        let now = self.clock.now();
        let timer = self.timer.as_mut().ok_or(ValidationError::NoActiveBlock)?;
        let event = timer.stop(now, &mut self.ledger, &mut self.stats);
        self.settle_timer();
        self.persist();
        Ok(event)
    }

    /// One elapsed second. No-op without a running timer.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        let events = timer.tick(now, &mut self.ledger, &mut self.stats);
        self.settle_timer();
        self.persist();
        events
    }

    /// Count the whole seconds elapsed since the timer was last synced.
    /// Safe to call at any polling rate; stalls longer than the resync
    /// threshold are caught up in one step.
    pub fn advance(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let threshold = self.config.timer.resync_threshold_secs;
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        let before = timer.remaining_secs();
        let events = timer.advance(now, threshold, &mut self.ledger, &mut self.stats);
        if !events.is_empty() || timer.remaining_secs() != before {
            self.settle_timer();
            self.persist();
        }
        events
    }

    /// Catch up after the tick source stalled (sleep, hidden window).
    pub fn resync(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let threshold = self.config.timer.resync_threshold_secs;
        let Some(timer) = self.timer.as_mut() else {
            return Vec::new();
        };
        let events = timer.resync(now, threshold, &mut self.ledger, &mut self.stats);
        if !events.is_empty() {
            self.settle_timer();
            self.persist();
        }
        events
    }

    pub fn respond_to_protocol(
        &mut self,
        protocol_id: u32,
        outcome: ProtocolOutcome,
    ) -> Result<Vec<Event>, ValidationError> {
        let now = self.clock.now();
        let events = self.timer_mut()?.respond(protocol_id, outcome, now)?;
        if !events.is_empty() {
            tracing::info!(protocol_id, ?outcome, "protocol resolved");
            self.persist();
        }
        Ok(events)
    }

    // ── Breaks ───────────────────────────────────────────────────────

    pub fn log_break(
        &mut self,
        duration_min: u32,
        break_type: BreakType,
        activities: ActivityFlags,
    ) -> Result<Event, ValidationError> {
        let now = self.clock.now();
        let log = self.calculator.apply(
            duration_min,
            break_type,
            activities,
            &mut self.ledger,
            &mut self.stats,
            now,
        )?;
        self.breaks.push(log.clone());
        self.persist();
        Ok(Event::BreakLogged { log })
    }

    pub fn preview_break(
        &self,
        duration_min: u32,
        break_type: BreakType,
        activities: ActivityFlags,
    ) -> Result<ClearancePreview, ValidationError> {
        self.calculator
            .preview(duration_min, break_type, activities, &self.ledger)
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> &DebtLedger {
        &self.ledger
    }

    pub fn total_debt(&self) -> u32 {
        self.ledger.total()
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.policy.risk_level(self.ledger.total())
    }

    pub fn max_allowed_duration(&self) -> u32 {
        self.policy.max_allowed_duration(self.ledger.total())
    }

    pub fn conservative_mode(&self) -> bool {
        self.policy.is_active(self.ledger.total())
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_summary(&self) -> StatsSummary {
        self.stats.summary(&self.blocks, &self.breaks)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, block_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == block_id)
    }

    pub fn breaks(&self) -> &[BreakLog] {
        &self.breaks
    }

    /// Blocks created on the current UTC date.
    pub fn todays_blocks(&self) -> Vec<&Block> {
        let today = self.clock.now().date_naive();
        self.blocks
            .iter()
            .filter(|b| b.created_at.date_naive() == today)
            .collect()
    }

    /// Breaks logged on the current UTC date.
    pub fn todays_breaks(&self) -> Vec<&BreakLog> {
        let today = self.clock.now().date_naive();
        self.breaks
            .iter()
            .filter(|b| b.timestamp.date_naive() == today)
            .collect()
    }

    pub fn active_block_id(&self) -> Option<&str> {
        self.timer.as_ref().map(|t| t.block_id())
    }

    pub fn timer(&self) -> Option<&SessionTimer> {
        self.timer.as_ref()
    }

    pub fn timer_state(&self) -> Option<TimerState> {
        self.timer.as_ref().map(|t| t.state())
    }

    pub fn remaining_secs(&self) -> Option<u64> {
        self.timer.as_ref().map(|t| t.remaining_secs())
    }

    pub fn protocol_statuses(&self) -> Vec<ProtocolView> {
        self.timer
            .as_ref()
            .map(|t| t.protocols())
            .unwrap_or_default()
    }

    /// Current timer status as a `StateSnapshot` event.
    pub fn timer_status(&self) -> Option<Event> {
        let now = self.clock.now();
        self.timer.as_ref().map(|t| t.status_event(now))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn timer_mut(&mut self) -> Result<&mut SessionTimer, ValidationError> {
        self.timer.as_mut().ok_or(ValidationError::NoActiveBlock)
    }

    /// Once the active timer completes, store its outcome on the block and
    /// clear the active slot.
    fn settle_timer(&mut self) {
        let Some(timer) = self.timer.as_ref() else {
            return;
        };
        if timer.state() != TimerState::Completed {
            return;
        }
        let completion = timer.completion().cloned();
        let block_id = timer.block_id().to_string();
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == block_id) {
            block.completed = true;
            block.completion = completion;
        }
        self.timer = None;
    }

    /// Write every record. Failures are logged and otherwise ignored.
    fn persist(&mut self) {
        let now = self.clock.now();
        let store: &dyn KvStore = self.store.as_ref();
        let mut results = vec![
            (DEBT_LEDGER, records::save(store, DEBT_LEDGER, &self.ledger)),
            (STATS, records::save(store, STATS, &self.stats)),
            (BLOCKS, records::save(store, BLOCKS, &self.blocks)),
            (BREAKS, records::save(store, BREAKS, &self.breaks)),
        ];
        match self.timer.as_ref() {
            Some(timer) => {
                results.push((ACTIVE_BLOCK, records::save(store, ACTIVE_BLOCK, &timer.block_id())));
                let snapshot = timer.snapshot(now);
                results.push((TIMER_STATE, records::save(store, TIMER_STATE, &snapshot)));
            }
            None => {
                results.push((ACTIVE_BLOCK, records::remove(store, ACTIVE_BLOCK)));
                results.push((TIMER_STATE, records::remove(store, TIMER_STATE)));
            }
        }
        for (key, result) in results {
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "failed to persist record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::debt::DebtCategory;
    use crate::protocol::{CategorySchedule, ProtocolConfig};
    use crate::storage::MemoryStore;

    fn engine() -> (FocusEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine =
            FocusEngine::open(Box::new(MemoryStore::new()), clock.clone(), Config::default());
        (engine, clock)
    }

    fn request(duration_min: u32) -> BlockRequest {
        BlockRequest {
            duration_min,
            category_label: "Deep work".into(),
            notes: String::new(),
            protocol_config: Some(ProtocolConfig::default()),
        }
    }

    fn created_id(event: Event) -> String {
        match event {
            Event::BlockCreated { block, .. } => block.id,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn create_block_validates_in_order() {
        let (mut engine, _) = engine();
        assert!(matches!(
            engine.create_block(request(3)),
            Err(ValidationError::DurationTooShort { .. })
        ));
        let mut req = request(50);
        req.category_label = "   ".into();
        assert_eq!(engine.create_block(req), Err(ValidationError::EmptyCategoryLabel));

        let mut req = request(50);
        let mut cfg = ProtocolConfig::default();
        cfg.posture = CategorySchedule::every(0);
        req.protocol_config = Some(cfg);
        assert!(matches!(
            engine.create_block(req),
            Err(ValidationError::InvalidInterval { .. })
        ));

        let mut req = request(50);
        req.protocol_config = Some(ProtocolConfig::none());
        assert_eq!(engine.create_block(req), Err(ValidationError::EmptyProtocolSchedule));
        assert!(engine.blocks().is_empty());
    }

    #[test]
    fn conservative_limit_uses_live_ledger() {
        let (mut engine, _) = engine();
        engine.ledger.apply(DebtCategory::Eye, 6);
        let err = engine.create_block(request(60)).unwrap_err();
        assert!(matches!(err, ValidationError::ConservativeLimit { max_allowed: 50, .. }));
        assert!(engine.create_block(request(50)).is_ok());
    }

    #[test]
    fn activation_rules() {
        let (mut engine, _) = engine();
        let a = created_id(engine.create_block(request(25)).unwrap());
        let b = created_id(engine.create_block(request(25)).unwrap());

        engine.activate_block(&a).unwrap();
        // idle active block is replaced
        engine.activate_block(&b).unwrap();
        assert_eq!(engine.active_block_id(), Some(b.as_str()));

        engine.start_timer().unwrap();
        assert_eq!(
            engine.activate_block(&a),
            Err(ValidationError::BlockInProgress(b.clone()))
        );
        assert_eq!(engine.delete_block(&b), Err(ValidationError::BlockInProgress(b.clone())));
        assert!(engine.delete_block(&a).is_ok());
        assert_eq!(
            engine.activate_block("nope"),
            Err(ValidationError::UnknownBlock("nope".into()))
        );
    }

    #[test]
    fn timer_commands_need_an_active_block() {
        let (mut engine, _) = engine();
        assert_eq!(engine.start_timer(), Err(ValidationError::NoActiveBlock));
        assert_eq!(engine.stop_timer(), Err(ValidationError::NoActiveBlock));
        assert!(engine.tick().is_empty());
    }

    #[test]
    fn stop_settles_block_and_clears_active() {
        let (mut engine, clock) = engine();
        let id = created_id(engine.create_block(request(25)).unwrap());
        engine.activate_block(&id).unwrap();
        engine.start_timer().unwrap();
        for _ in 0..60 {
            clock.advance_secs(1);
            engine.tick();
        }
        let event = engine.stop_timer().unwrap();
        assert!(matches!(event, Some(Event::BlockFinalized { .. })));
        assert!(engine.active_block_id().is_none());

        let block = engine.block(&id).unwrap();
        assert!(block.completed);
        let completion = block.completion.as_ref().unwrap();
        assert_eq!(completion.actual_minutes, 1);
        assert_eq!(completion.early_termination_debt, 1);
        assert_eq!(
            engine.activate_block(&id),
            Err(ValidationError::BlockAlreadyCompleted(id.clone()))
        );
    }

    #[test]
    fn break_rejection_mutates_nothing() {
        let (mut engine, _) = engine();
        engine.ledger.apply(DebtCategory::Eye, 2);
        let err = engine
            .log_break(45, BreakType::ScreenFree, ActivityFlags::default())
            .unwrap_err();
        assert!(matches!(err, ValidationError::BreakTooShort { .. }));
        assert_eq!(engine.total_debt(), 2);
        assert_eq!(engine.stats().breaks_taken, 0);
        assert!(engine.breaks().is_empty());

        let preview = engine
            .preview_break(60, BreakType::ScreenFree, ActivityFlags::default())
            .unwrap();
        assert_eq!(preview.total_debt_after, 1);
        assert_eq!(engine.total_debt(), 2);
    }

    #[test]
    fn todays_views_filter_by_date() {
        let (mut engine, clock) = engine();
        engine.create_block(request(25)).unwrap();
        assert_eq!(engine.todays_blocks().len(), 1);
        clock.advance_secs(2 * 24 * 3600);
        assert!(engine.todays_blocks().is_empty());
        assert_eq!(engine.blocks().len(), 1);
    }
}
