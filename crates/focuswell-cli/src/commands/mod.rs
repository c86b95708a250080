pub mod block;
pub mod breaks;
pub mod config;
pub mod debt;
pub mod stats;
pub mod timer;

use std::sync::Arc;

use focuswell_core::storage::Database;
use focuswell_core::{Config, Event, FocusEngine, SystemClock};
use serde::Serialize;

/// Open the engine on the default database and configuration.
///
/// Anything that happened while no process was running (a timer that
/// caught up, or finished) is returned alongside.
pub fn open_engine() -> Result<(FocusEngine, Vec<Event>), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = FocusEngine::open(Box::new(db), Arc::new(SystemClock), config);
    let events = engine.take_startup_events();
    for event in &events {
        tracing::info!(event = ?event, "caught up on open");
    }
    Ok((engine, events))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
