//! Datagate CLI - dataset quality gate.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::debug;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Validate {
            dataset,
            manifest,
            output,
            format,
            timeout,
            sequential,
        } => commands::validate::run(
            dataset,
            manifest,
            output,
            format.into(),
            timeout,
            sequential,
            cli.verbose,
        ),

        Commands::Render { report, output } => {
            commands::render::run(report, output, cli.verbose).map(|()| commands::EXIT_PASS)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(commands::EXIT_FATAL);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}
