use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "focuswell", version, about = "Focus blocks with recovery debt tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, activate and delete focus blocks
    Block {
        #[command(subcommand)]
        action: commands::block::BlockAction,
    },
    /// Control the active block's timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Log breaks to clear debt
    Break {
        #[command(subcommand)]
        action: commands::breaks::BreakAction,
    },
    /// Current recovery debt and conservative mode limit
    Debt,
    /// Lifetime statistics and review metrics
    Stats,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr, filtered by `FOCUSWELL_LOG` (default `warn`).
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("FOCUSWELL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Block { action } => commands::block::run(action),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Break { action } => commands::breaks::run(action),
        Commands::Debt => commands::debt::run(),
        Commands::Stats => commands::stats::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
