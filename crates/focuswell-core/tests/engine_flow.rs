//! End-to-end engine flows: planning, running, breaks and resuming from a
//! persisted store.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use focuswell_core::storage::records;
use focuswell_core::*;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()))
}

fn memory_engine(clock: &Arc<ManualClock>) -> FocusEngine {
    FocusEngine::open(Box::new(MemoryStore::new()), clock.clone(), Config::default())
}

fn eye_only(interval: u32) -> ProtocolConfig {
    let mut cfg = ProtocolConfig::none();
    cfg.eye = CategorySchedule::every(interval);
    cfg
}

fn request(duration_min: u32, cfg: Option<ProtocolConfig>) -> BlockRequest {
    BlockRequest {
        duration_min,
        category_label: "Deep work".into(),
        notes: "chapter 3".into(),
        protocol_config: cfg,
    }
}

fn create(engine: &mut FocusEngine, req: BlockRequest) -> Block {
    match engine.create_block(req).unwrap() {
        Event::BlockCreated { block, .. } => block,
        other => panic!("unexpected event {other:?}"),
    }
}

fn run(engine: &mut FocusEngine, clock: &ManualClock, secs: u64) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..secs {
        clock.advance_secs(1);
        events.extend(engine.tick());
    }
    events
}

fn seeded_store(eye: i64) -> MemoryStore {
    let store = MemoryStore::new();
    let mut ledger = DebtLedger::new();
    ledger.apply(DebtCategory::Eye, eye);
    records::save(&store, records::DEBT_LEDGER, &ledger).unwrap();
    store
}

#[test]
fn screen_free_hour_clears_one_eye_debt() {
    let mut engine = FocusEngine::open(Box::new(seeded_store(2)), clock(), Config::default());
    assert_eq!(engine.ledger().get(DebtCategory::Eye), 2);

    let event = engine
        .log_break(60, BreakType::ScreenFree, ActivityFlags::default())
        .unwrap();
    let Event::BreakLogged { log } = event else {
        panic!("expected BreakLogged");
    };
    assert_eq!(log.clearance.eye, 1);
    assert_eq!(engine.ledger().get(DebtCategory::Eye), 1);
    assert_eq!(engine.stats().debts_cleared, 1);
    assert_eq!(engine.todays_breaks().len(), 1);
}

#[test]
fn debt_of_six_caps_blocks_at_fifty_minutes() {
    let mut engine = FocusEngine::open(Box::new(seeded_store(6)), clock(), Config::default());
    assert_eq!(engine.max_allowed_duration(), 50);
    assert_eq!(engine.risk_level(), RiskLevel::High);
    assert!(engine.conservative_mode());

    let err = engine
        .create_block(request(90, Some(ProtocolConfig::default())))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::ConservativeLimit {
            requested: 90,
            max_allowed: 50,
            total_debt: 6,
            risk: RiskLevel::High,
        }
    );
    assert!(engine.blocks().is_empty());
}

#[test]
fn ninety_minute_block_stopped_at_sixty() {
    let clock = clock();
    let mut engine = memory_engine(&clock);
    let block = create(&mut engine, request(90, Some(eye_only(20))));
    let triggers: Vec<u32> = block.protocols.iter().map(|p| p.trigger_minute).collect();
    assert_eq!(triggers, vec![20, 40, 60, 80]);

    engine.activate_block(&block.id).unwrap();
    engine.start_timer().unwrap();

    // first protocol: rejected before it triggers, completed after
    run(&mut engine, &clock, 15 * 60);
    assert_eq!(
        engine.respond_to_protocol(0, ProtocolOutcome::Complete),
        Err(ValidationError::ProtocolNotTriggered(0))
    );
    run(&mut engine, &clock, 5 * 60);
    assert_eq!(engine.timer_state(), Some(TimerState::ProtocolPrompt));
    engine.respond_to_protocol(0, ProtocolOutcome::Complete).unwrap();

    // second: skipped
    run(&mut engine, &clock, 20 * 60);
    engine.respond_to_protocol(1, ProtocolOutcome::Skip).unwrap();

    // third: completed
    run(&mut engine, &clock, 20 * 60);
    engine.respond_to_protocol(2, ProtocolOutcome::Complete).unwrap();
    assert_eq!(engine.timer().unwrap().actual_secs(), 3600);

    let Some(Event::BlockFinalized { completion, .. }) = engine.stop_timer().unwrap() else {
        panic!("expected BlockFinalized");
    };
    assert_eq!(completion.remaining_minutes, 30);
    assert_eq!(completion.early_termination_debt, 2);
    assert_eq!(completion.completed, 2);
    assert_eq!(completion.skipped, 2);

    // skips: eye x2; penalty: eye, hydration
    assert_eq!(engine.ledger().get(DebtCategory::Eye), 3);
    assert_eq!(engine.ledger().get(DebtCategory::Hydration), 1);
    let summary = engine.stats_summary();
    assert_eq!(summary.counters.debts_created, 4);
    assert_eq!(summary.compliance_rate_pct, 50);
    assert_eq!(summary.net_debt, 4);
    assert_eq!(summary.average_block_min, 60);
    assert_eq!(summary.compliance_trend, ComplianceTrend::NeedsImprovement);
    assert_eq!(summary.block_distribution.extended, 1);
    assert_eq!(summary.best_block_size, Some(TemplateTier::Extended));
    assert!(engine.active_block_id().is_none());
}

#[test]
fn clean_block_leaves_ledger_untouched() {
    let clock = clock();
    let mut engine = memory_engine(&clock);
    let block = create(&mut engine, request(25, Some(eye_only(20))));
    engine.activate_block(&block.id).unwrap();
    engine.start_timer().unwrap();

    let mut finalized = false;
    for _ in 0..(25 * 60 + 5) {
        clock.advance_secs(1);
        for event in engine.tick() {
            match event {
                Event::ProtocolPrompted { protocol_id, .. } => {
                    engine
                        .respond_to_protocol(protocol_id, ProtocolOutcome::Complete)
                        .unwrap();
                }
                Event::BlockFinalized { .. } => finalized = true,
                _ => {}
            }
        }
    }
    assert!(finalized);
    assert_eq!(engine.total_debt(), 0);
    assert_eq!(engine.stats().debts_created, 0);
    assert_eq!(engine.stats().blocks_completed, 1);
    assert_eq!(engine.stats().protocols_completed, 1);
    assert!(engine.block(&block.id).unwrap().completed);
}

#[test]
fn template_block_uses_fixed_schedule() {
    let mut engine = FocusEngine::open(Box::new(MemoryStore::new()), clock(), Config::default());
    let block = create(&mut engine, request(50, None));
    assert_eq!(block.protocols.len(), 4);
    assert!(block.protocol_config.is_none());
    assert!(block.protocols.iter().all(|p| p.trigger_minute < 50));
}

#[test]
fn resync_only_after_real_gap() {
    let clock = clock();
    let mut engine = memory_engine(&clock);
    let block = create(&mut engine, request(25, Some(eye_only(20))));
    engine.activate_block(&block.id).unwrap();
    engine.start_timer().unwrap();

    clock.advance_secs(2);
    assert!(engine.resync().is_empty());
    assert_eq!(engine.remaining_secs(), Some(1500));

    clock.advance_secs(58);
    let events = engine.resync();
    assert!(matches!(events[0], Event::TimerCaughtUp { gap_secs: 60, consumed_secs: 60, .. }));
    assert_eq!(engine.remaining_secs(), Some(1440));
}

#[test]
fn advance_counts_each_wall_second_once() {
    let clock = clock();
    let mut engine = memory_engine(&clock);
    let block = create(&mut engine, request(25, Some(eye_only(20))));
    engine.activate_block(&block.id).unwrap();
    engine.start_timer().unwrap();
    let t0 = engine.now();

    // stalled past the resync threshold
    clock.advance_secs(3);
    let events = engine.advance();
    assert!(matches!(events[0], Event::TimerCaughtUp { gap_secs: 3, .. }));
    assert!(engine.advance().is_empty());
    assert_eq!(engine.remaining_secs(), Some(1497));

    // polled five times a second
    for step in 1..=10 {
        clock.set(t0 + chrono::Duration::seconds(3) + chrono::Duration::milliseconds(200 * step));
        engine.advance();
    }
    assert_eq!(engine.remaining_secs(), Some(1495));
    assert_eq!(engine.timer().map(|t| t.actual_secs()), Some(5));

    // off-beat polls: the fraction left after each counted second carries
    // over even though every counted second is persisted
    for step in 1..=10 {
        clock.set(t0 + chrono::Duration::seconds(5) + chrono::Duration::milliseconds(700 * step));
        engine.advance();
    }
    assert_eq!(engine.remaining_secs(), Some(1488));
    assert_eq!(engine.timer().map(|t| t.actual_secs()), Some(12));
}

mod resume {
    use super::*;

    fn open(path: &std::path::Path, clock: &Arc<ManualClock>) -> FocusEngine {
        let db = Database::open_at(path).unwrap();
        FocusEngine::open(Box::new(db), clock.clone(), Config::default())
    }

    #[test]
    fn running_timer_catches_up_and_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuswell.db");
        let clock = clock();

        let block_id = {
            let mut engine = open(&path, &clock);
            let block = create(&mut engine, request(25, Some(eye_only(20))));
            engine.activate_block(&block.id).unwrap();
            engine.start_timer().unwrap();
            run(&mut engine, &clock, 30);
            block.id
        };

        clock.advance_secs(21 * 60);
        let mut engine = open(&path, &clock);
        let events = engine.take_startup_events();
        assert!(matches!(
            events[0],
            Event::TimerCaughtUp { gap_secs: 1260, consumed_secs: 1260, remaining_secs: 210, .. }
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::ProtocolPrompted { protocol_id: 0, .. })));
        assert_eq!(engine.active_block_id(), Some(block_id.as_str()));
        assert_eq!(engine.timer_state(), Some(TimerState::ProtocolPrompt));
        assert_eq!(engine.remaining_secs(), Some(210));
        assert!(engine.take_startup_events().is_empty());
    }

    #[test]
    fn paused_timer_restores_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuswell.db");
        let clock = clock();
        {
            let mut engine = open(&path, &clock);
            let block = create(&mut engine, request(25, Some(eye_only(20))));
            engine.activate_block(&block.id).unwrap();
            engine.start_timer().unwrap();
            run(&mut engine, &clock, 90);
            engine.pause_timer().unwrap();
        }

        clock.advance_secs(3 * 3600);
        let mut engine = open(&path, &clock);
        assert!(engine.take_startup_events().is_empty());
        assert_eq!(engine.timer_state(), Some(TimerState::Paused));
        assert_eq!(engine.remaining_secs(), Some(1410));

        let event = engine.start_timer().unwrap();
        assert!(matches!(event, Some(Event::TimerStarted { resumed: true, .. })));
    }

    #[test]
    fn gap_past_the_end_finalizes_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuswell.db");
        let clock = clock();
        let block_id = {
            let mut engine = open(&path, &clock);
            let block = create(&mut engine, request(25, Some(eye_only(20))));
            engine.activate_block(&block.id).unwrap();
            engine.start_timer().unwrap();
            run(&mut engine, &clock, 30);
            block.id
        };

        clock.advance_secs(2 * 3600);
        let mut engine = open(&path, &clock);
        let events = engine.take_startup_events();
        assert!(matches!(events.last(), Some(Event::BlockFinalized { .. })));
        assert!(engine.active_block_id().is_none());
        assert!(engine.block(&block_id).unwrap().completed);
        // unanswered eye protocol, no penalty
        assert_eq!(engine.ledger().get(DebtCategory::Eye), 1);
        assert_eq!(engine.total_debt(), 1);

        // outcome is durable
        drop(engine);
        let engine = open(&path, &clock);
        assert!(engine.active_block_id().is_none());
        assert_eq!(engine.stats().blocks_completed, 1);
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_idle_timer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focuswell.db");
        let clock = clock();
        {
            let mut engine = open(&path, &clock);
            let block = create(&mut engine, request(25, Some(eye_only(20))));
            engine.activate_block(&block.id).unwrap();
            engine.start_timer().unwrap();
        }
        Database::open_at(&path)
            .unwrap()
            .kv_set(records::TIMER_STATE, "{\"version\":1,\"data\":{\"oops\":true}}")
            .unwrap();

        let engine = open(&path, &clock);
        assert_eq!(engine.timer_state(), Some(TimerState::Idle));
        assert_eq!(engine.remaining_secs(), Some(1500));
        assert_eq!(engine.total_debt(), 0);
    }
}
