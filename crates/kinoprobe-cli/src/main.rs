//! Kinoprobe CLI: runs the Kinopoisk regression scenarios
//!
//! ## Usage
//!
//! ```bash
//! kinoprobe list                          # Every scenario
//! kinoprobe run -m "api and smoke"        # Keyed API smoke checks
//! kinoprobe run -m ui --format json       # Browser scenarios, JSON report
//! kinoprobe config                        # Resolved settings, key masked
//! ```

use clap::Parser;
use kinoprobe_cli::{
    execute_config, execute_list, execute_run, init_tracing, Cli, CliConfig, CliResult,
    ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity, cli.log_format.into());

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::List(args) => execute_list(&args),
        Commands::Config(args) => execute_config(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        match cli.verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    };

    let color: ColorChoice = cli.color.into();

    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
