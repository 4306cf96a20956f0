use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxsync::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxsync::AppCommand {
    fn from(cmd: Commands) -> fxsync::AppCommand {
        match cmd {
            Commands::Currencies => fxsync::AppCommand::Currencies,
            Commands::Quote { base, quote } => fxsync::AppCommand::Quote { base, quote },
            Commands::Sync => fxsync::AppCommand::Sync,
            Commands::History { pair } => fxsync::AppCommand::History { pair },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display today's rate table
    Currencies,
    /// Display the cross rate of two currencies and refresh its history
    ///
    /// Repeated quotes for a pair schedule at most one refresh per
    /// `sync.lock_ttl_secs`, but only within one process. Separate
    /// invocations each run their own refresh.
    Quote {
        /// Base currency code, e.g. EUR
        base: String,
        /// Quote currency code, e.g. USD
        quote: String,
    },
    /// Refresh the recent history of every known pair
    Sync,
    /// Display the stored history of a pair
    History {
        /// Pair symbol, e.g. EURUSD
        pair: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxsync::cli::setup::setup(),
        Some(cmd) => fxsync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
