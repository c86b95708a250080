use clap::{Args, Subcommand};
use focuswell_core::{BlockRequest, CategorySchedule, ProtocolConfig};

use super::{open_engine, print_json};

#[derive(Subcommand)]
pub enum BlockAction {
    /// Plan a new block
    Create {
        /// Planned length in minutes (5-180, lower under conservative mode)
        #[arg(long, short)]
        duration: u32,
        /// What the block is for
        #[arg(long, short)]
        label: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Use the fixed template for the duration instead of intervals
        #[arg(
            long,
            conflicts_with_all = [
                "eye", "hydration", "mobility", "posture",
                "no_eye", "no_hydration", "no_mobility", "no_posture",
            ]
        )]
        template: bool,
        #[command(flatten)]
        protocols: ProtocolArgs,
    },
    /// List blocks
    List {
        /// Only blocks created today
        #[arg(long)]
        today: bool,
    },
    /// Make a block the active one (its timer starts idle)
    Start {
        id: String,
    },
    /// Delete a block that is not active
    Delete {
        id: String,
    },
}

/// Per-category overrides on top of `[protocols]` in config.toml.
#[derive(Args)]
pub struct ProtocolArgs {
    /// Eye rest interval in minutes
    #[arg(long, value_name = "MIN")]
    eye: Option<u32>,
    /// Hydration interval in minutes
    #[arg(long, value_name = "MIN")]
    hydration: Option<u32>,
    /// Mobility interval in minutes
    #[arg(long, value_name = "MIN")]
    mobility: Option<u32>,
    /// Posture interval in minutes
    #[arg(long, value_name = "MIN")]
    posture: Option<u32>,
    #[arg(long, conflicts_with = "eye")]
    no_eye: bool,
    #[arg(long, conflicts_with = "hydration")]
    no_hydration: bool,
    #[arg(long, conflicts_with = "mobility")]
    no_mobility: bool,
    #[arg(long, conflicts_with = "posture")]
    no_posture: bool,
}

impl ProtocolArgs {
    fn apply(&self, mut config: ProtocolConfig) -> ProtocolConfig {
        fn category(schedule: &mut CategorySchedule, interval: Option<u32>, disable: bool) {
            if let Some(interval) = interval {
                *schedule = CategorySchedule::every(interval);
            }
            if disable {
                schedule.enabled = false;
            }
        }
        category(&mut config.eye, self.eye, self.no_eye);
        category(&mut config.hydration, self.hydration, self.no_hydration);
        category(&mut config.mobility, self.mobility, self.no_mobility);
        category(&mut config.posture, self.posture, self.no_posture);
        config
    }
}

pub fn run(action: BlockAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, _) = open_engine()?;

    match action {
        BlockAction::Create {
            duration,
            label,
            notes,
            template,
            protocols,
        } => {
            let protocol_config = if template {
                None
            } else {
                Some(protocols.apply(engine.config().protocols))
            };
            let event = engine.create_block(BlockRequest {
                duration_min: duration,
                category_label: label,
                notes,
                protocol_config,
            })?;
            print_json(&event)?;
        }
        BlockAction::List { today } => {
            if today {
                print_json(&engine.todays_blocks())?;
            } else {
                print_json(engine.blocks())?;
            }
        }
        BlockAction::Start { id } => {
            let event = engine.activate_block(&id)?;
            print_json(&event)?;
        }
        BlockAction::Delete { id } => {
            let event = engine.delete_block(&id)?;
            print_json(&event)?;
        }
    }
    Ok(())
}
