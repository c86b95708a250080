use std::time::Duration;

use clap::{Subcommand, ValueEnum};
use focuswell_core::{Event, FocusEngine, ProtocolOutcome, ProtocolView, TimerState};
use serde::Serialize;

use super::{open_engine, print_json};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start or resume the active block
    Start,
    /// Pause the running timer
    Pause,
    /// End the active block now (unused minutes are charged as debt)
    Stop,
    /// Print timer state and protocol statuses as JSON
    Status,
    /// Complete or skip the prompted protocol
    Respond {
        /// Protocol id from `timer status`
        id: u32,
        #[arg(value_enum)]
        outcome: OutcomeArg,
    },
    /// Count down in the foreground, printing events as JSON lines, until
    /// the block finishes or a protocol needs a response
    Run {
        /// Stop after polling the clock this many times
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Account for time the timer missed (sleep, suspended terminal)
    Resync,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Complete,
    Skip,
}

impl From<OutcomeArg> for ProtocolOutcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Complete => ProtocolOutcome::Complete,
            OutcomeArg::Skip => ProtocolOutcome::Skip,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusReport {
    status: Option<Event>,
    protocols: Vec<ProtocolView>,
    /// Events from catching up since the last command.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    caught_up: Vec<Event>,
}

fn status_report(engine: &FocusEngine, caught_up: Vec<Event>) -> StatusReport {
    StatusReport {
        status: engine.timer_status(),
        protocols: engine.protocol_statuses(),
        caught_up,
    }
}

fn print_event_or_status(
    engine: &FocusEngine,
    event: Option<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_json(&event),
        None => print_json(&status_report(engine, Vec::new())),
    }
}

fn print_line(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, caught_up) = open_engine()?;

    match action {
        TimerAction::Start => {
            let event = engine.start_timer()?;
            print_event_or_status(&engine, event)?;
        }
        TimerAction::Pause => {
            let event = engine.pause_timer()?;
            print_event_or_status(&engine, event)?;
        }
        TimerAction::Stop => {
            let event = engine.stop_timer()?;
            print_event_or_status(&engine, event)?;
        }
        TimerAction::Status => {
            print_json(&status_report(&engine, caught_up))?;
        }
        TimerAction::Respond { id, outcome } => {
            let events = engine.respond_to_protocol(id, outcome.into())?;
            print_json(&events)?;
        }
        TimerAction::Resync => {
            let events = engine.resync();
            print_json(&events)?;
        }
        TimerAction::Run { ticks } => {
            for event in &caught_up {
                print_line(event)?;
            }
            run_loop(&mut engine, ticks)?;
        }
    }
    Ok(())
}

fn run_loop(
    engine: &mut FocusEngine,
    max_polls: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let poll = Duration::from_millis(engine.config().timer.poll_interval_ms);
    let mut count = 0u64;

    loop {
        match engine.timer_state() {
            Some(TimerState::Running) => {}
            Some(TimerState::ProtocolPrompt) => {
                if let Some(protocol) = engine.timer().and_then(|t| t.prompt()) {
                    tracing::info!(
                        protocol_id = protocol.id,
                        name = %protocol.name,
                        "waiting for response"
                    );
                }
                break;
            }
            Some(state) => {
                tracing::info!(?state, "timer not running");
                break;
            }
            None => break,
        }
        if max_polls.is_some_and(|max| count >= max) {
            break;
        }

        std::thread::sleep(poll);
        for event in engine.advance() {
            print_line(&event)?;
        }
        count += 1;
    }

    if let Some(status) = engine.timer_status() {
        print_line(&status)?;
    }
    Ok(())
}
