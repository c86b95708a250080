use super::{open_engine, print_json};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (engine, _) = open_engine()?;
    print_json(&engine.stats_summary())
}
