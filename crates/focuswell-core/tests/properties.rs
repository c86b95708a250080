//! Property-based tests for the debt, scheduling and timer invariants.

use chrono::{Duration, TimeZone, Utc};
use focuswell_core::*;
use proptest::prelude::*;

fn arb_category() -> impl Strategy<Value = DebtCategory> {
    prop_oneof![
        Just(DebtCategory::Eye),
        Just(DebtCategory::Hydration),
        Just(DebtCategory::Mobility),
        Just(DebtCategory::Posture),
        Just(DebtCategory::TimeDebt),
    ]
}

fn arb_schedule() -> impl Strategy<Value = CategorySchedule> {
    (any::<bool>(), 5u32..120).prop_map(|(enabled, interval_min)| CategorySchedule {
        enabled,
        interval_min,
    })
}

fn arb_config() -> impl Strategy<Value = ProtocolConfig> {
    (arb_schedule(), arb_schedule(), arb_schedule(), arb_schedule()).prop_map(
        |(eye, hydration, mobility, posture)| ProtocolConfig {
            eye,
            hydration,
            mobility,
            posture,
        },
    )
}

fn block_for(duration_min: u32, config: ProtocolConfig) -> Block {
    let protocols = ProtocolScheduler::configured(duration_min, &config);
    Block::new(duration_min, "prop", "", protocols, Some(config), Utc::now())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn max_allowed_duration_never_increases_with_debt(a in 0u32..1000, b in 0u32..1000) {
        let policy = ConservativeModePolicy::new();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(policy.max_allowed_duration(lo) >= policy.max_allowed_duration(hi));
        let allowed = policy.max_allowed_duration(a);
        prop_assert!([25, 50, 90, 180].contains(&allowed));
    }

    #[test]
    fn ledger_never_goes_negative(
        ops in proptest::collection::vec((arb_category(), -50i64..50), 0..64),
    ) {
        let mut ledger = DebtLedger::new();
        let mut expected: i64 = 0;
        for (category, delta) in ops {
            let before = i64::from(ledger.get(category));
            let after = ledger.apply(category, delta);
            prop_assert_eq!(i64::from(after), (before + delta).max(0));
            expected += i64::from(after) - before;
        }
        prop_assert_eq!(i64::from(ledger.total()), expected);
    }

    #[test]
    fn configured_schedule_sorted_and_inside_block(
        duration in 5u32..=180,
        config in arb_config(),
    ) {
        let protocols = ProtocolScheduler::configured(duration, &config);
        for pair in protocols.windows(2) {
            prop_assert!(
                (pair[0].trigger_minute, pair[0].category.priority())
                    <= (pair[1].trigger_minute, pair[1].category.priority())
            );
        }
        for (idx, p) in protocols.iter().enumerate() {
            prop_assert!(p.trigger_minute < duration);
            prop_assert!(p.trigger_minute >= 5);
            prop_assert_eq!(p.id as usize, idx);
        }
        if !config.any_enabled() {
            prop_assert!(protocols.is_empty());
        }
    }

    #[test]
    fn template_schedule_inside_block(duration in 5u32..=180) {
        let protocols = ProtocolScheduler::template(duration);
        prop_assert!(protocols.iter().all(|p| p.trigger_minute < duration));
        prop_assert!(protocols.windows(2).all(|w| w[0].trigger_minute <= w[1].trigger_minute));
    }

    #[test]
    fn finalize_charges_skips_plus_penalty(
        duration in 5u32..=180,
        config in arb_config(),
        run_secs in 0u64..6_000,
        complete_prompts in any::<bool>(),
    ) {
        let block = block_for(duration, config);
        let mut timer = SessionTimer::new(&block);
        let mut ledger = DebtLedger::new();
        let mut stats = Stats::default();
        let mut now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        timer.start(now);

        // debt only moves at finalize, which may happen inside the loop
        let created_before = stats.debts_created;
        let total_before = ledger.total();
        for _ in 0..run_secs {
            if timer.state() == TimerState::Completed {
                break;
            }
            now += Duration::seconds(1);
            timer.tick(now, &mut ledger, &mut stats);
            while let Some(id) = timer.prompt().map(|p| p.id) {
                let outcome = if complete_prompts {
                    ProtocolOutcome::Complete
                } else {
                    ProtocolOutcome::Skip
                };
                timer.respond(id, outcome, now).unwrap();
            }
        }
        timer.stop(now, &mut ledger, &mut stats);
        let completion = timer.completion().cloned().unwrap();

        let added = stats.debts_created - created_before;
        prop_assert_eq!(added, u64::from(completion.skipped) + completion.remaining_minutes / 15);
        prop_assert_eq!(u64::from(ledger.total() - total_before), added);
        prop_assert_eq!(completion.completed + completion.skipped, block.protocols.len() as u32);

        // idempotent
        let (ledger_after, stats_after) = (ledger.clone(), stats.clone());
        prop_assert!(timer.finalize(now, &mut ledger, &mut stats).is_none());
        prop_assert_eq!(ledger, ledger_after);
        prop_assert_eq!(stats, stats_after);
    }

    #[test]
    fn resume_consumes_exactly_the_gap(
        duration in 5u32..=180,
        config in arb_config(),
        before in 0u64..600,
        gap in 0u64..12_000,
    ) {
        let block = block_for(duration, config);
        let mut timer = SessionTimer::new(&block);
        let mut ledger = DebtLedger::new();
        let mut stats = Stats::default();
        let start = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        timer.start(start);

        // advance without letting a prompt hold the timer
        let mut now = start;
        for _ in 0..before {
            now += Duration::seconds(1);
            timer.tick(now, &mut ledger, &mut stats);
            while let Some(id) = timer.prompt().map(|p| p.id) {
                timer.respond(id, ProtocolOutcome::Complete, now).unwrap();
            }
        }
        prop_assume!(timer.state() == TimerState::Running);

        let saved = timer.snapshot(now);
        let remaining = saved.time_remaining;
        let later = now + Duration::seconds(gap as i64);
        let (restored, _) =
            SessionTimer::restore(&block, &saved, later, &mut ledger, &mut stats).unwrap();

        prop_assert_eq!(restored.remaining_secs(), remaining - gap.min(remaining));
        prop_assert_eq!(restored.actual_secs(), saved.actual_time_spent + gap);

        let elapsed = restored.elapsed_secs();
        for view in restored.protocols() {
            if view.protocol.trigger_secs() <= elapsed {
                prop_assert_ne!(view.status, ProtocolStatus::Pending);
            } else {
                prop_assert_eq!(view.status, ProtocolStatus::Pending);
            }
        }
    }
}
