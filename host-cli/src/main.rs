mod args;
mod handler;

use clap::{Parser, Subcommand};
use tracing::trace;

use args::run::RunArgs;
use args::validate::ValidateArgs;

/// Plugin Host Runtime CLI: validate a plugin's manifest against a track
/// offline, or run a scan across a directory of plugins.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Verbosity level (0-3)
    ///
    /// Use multiple times for increased verbosity
    /// -v for DEBUG, -vv for TRACE
    ///
    /// Default verbosity is INFO
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output logs in JSON format
    #[arg(short, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a plugin binary's manifest against a track's policy without admitting it
    Validate(ValidateArgs),
    /// Spawn every plugin in a directory, admit them, and invoke a tool across all of them
    Run(RunArgs),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let max_level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    if args.json {
        tracing_subscriber::fmt().with_ansi(true).with_max_level(max_level).json().with_target(false).without_time().init();
    } else {
        tracing_subscriber::fmt().with_ansi(true).with_max_level(max_level).with_target(false).without_time().init();
    }

    match args.command {
        Commands::Validate(validate_args) => {
            trace!("running validate");
            handler::validate::handle(validate_args).await;
        },
        Commands::Run(run_args) => {
            trace!("running run");
            handler::run::handle(run_args).await;
        },
    }
}
