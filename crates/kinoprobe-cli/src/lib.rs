//! Kinoprobe CLI library
//!
//! Argument parsing, terminal output and the `run`, `list` and `config`
//! commands behind the `kinoprobe` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod logging;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigArgs, ListArgs, LogFormatArg, RunArgs, SuiteArgs};
pub use config::{CliConfig, ColorChoice, LogFormat, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::{default_directive, init_tracing};
pub use output::{OutputFormat, ProgressReporter};
pub use runner::{execute_config, execute_list, execute_run, ConfigView};
