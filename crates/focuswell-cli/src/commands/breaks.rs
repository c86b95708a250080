use clap::{Args, Subcommand};
use focuswell_core::{ActivityFlags, BreakType};

use super::{open_engine, print_json};

#[derive(Subcommand)]
pub enum BreakAction {
    /// Log a finished break and clear debt
    Log(BreakArgs),
    /// Show what a break would clear, without logging it
    Preview(BreakArgs),
    /// List logged breaks
    List {
        /// Only breaks logged today
        #[arg(long)]
        today: bool,
    },
}

#[derive(Args)]
pub struct BreakArgs {
    /// Break length in minutes
    #[arg(long, short)]
    minutes: u32,
    /// The break was spent in front of a screen
    #[arg(long)]
    on_screen: bool,
    /// Drank water during the break
    #[arg(long)]
    hydration: bool,
    /// Walked or stretched during the break
    #[arg(long)]
    mobility: bool,
    /// Did posture exercises during the break
    #[arg(long)]
    posture: bool,
}

impl BreakArgs {
    fn break_type(&self) -> BreakType {
        if self.on_screen {
            BreakType::OnScreen
        } else {
            BreakType::ScreenFree
        }
    }

    fn activities(&self) -> ActivityFlags {
        ActivityFlags {
            hydration: self.hydration,
            mobility: self.mobility,
            posture: self.posture,
        }
    }
}

pub fn run(action: BreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut engine, _) = open_engine()?;

    match action {
        BreakAction::Log(args) => {
            let event = engine.log_break(args.minutes, args.break_type(), args.activities())?;
            print_json(&event)?;
        }
        BreakAction::Preview(args) => {
            let preview = engine.preview_break(args.minutes, args.break_type(), args.activities())?;
            print_json(&preview)?;
        }
        BreakAction::List { today } => {
            if today {
                print_json(&engine.todays_breaks())?;
            } else {
                print_json(engine.breaks())?;
            }
        }
    }
    Ok(())
}
