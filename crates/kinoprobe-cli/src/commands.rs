//! CLI command definitions using clap

use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Kinoprobe: API and browser regression checks for Kinopoisk
#[derive(Parser, Debug)]
#[command(name = "kinoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format on stderr
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Settings shared by `run` and `config`.
///
/// Each flag falls back to the environment variable of the same meaning.
#[derive(Args, Debug, Clone, Default)]
pub struct SuiteArgs {
    /// Site under test
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Film API base URL
    #[arg(long, env = "API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Film API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-attempt element timeout in seconds
    #[arg(long, env = "UI_WAIT")]
    pub ui_wait: Option<u64>,

    /// Browser implicit wait in seconds
    #[arg(long, env = "IMPLICIT_WAIT")]
    pub implicit_wait: Option<u64>,

    /// Run the browser without a window (accepts 1/0, yes/no, on/off)
    #[arg(
        long,
        env = "KINOPROBE_HEADLESS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub headless: Option<bool>,
}

impl SuiteArgs {
    /// Value given on the command line for an environment key
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "BASE_URL" => self.base_url.clone(),
            "API_BASE_URL" => self.api_base_url.clone(),
            "API_KEY" => self.api_key.clone(),
            "UI_WAIT" => self.ui_wait.map(|secs| secs.to_string()),
            "IMPLICIT_WAIT" => self.implicit_wait.map(|secs| secs.to_string()),
            "KINOPROBE_HEADLESS" => self.headless.map(|on| on.to_string()),
            _ => None,
        }
    }
}

/// Arguments for the run command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Marker expression, e.g. "api and not regression"
    #[arg(short = 'm', long = "markers")]
    pub markers: Option<String>,

    /// Print the selection and exit
    #[arg(long)]
    pub list: bool,

    /// Report format on stdout
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Suite settings
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Marker expression
    #[arg(short = 'm', long = "markers")]
    pub markers: Option<String>,
}

/// Arguments for the config command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Suite settings
    #[command(flatten)]
    pub suite: SuiteArgs,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl From<LogFormatArg> for crate::config::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}
