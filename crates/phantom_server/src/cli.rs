//! Command-line interface handling for the phantom demo host.
//!
//! Every option overrides the matching configuration file setting.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the tick interval in milliseconds
    pub tick_ms: Option<u64>,
    /// Optional override for the number of simulated viewers
    pub viewers: Option<usize>,
}

impl CliArgs {
    /// Builds the clap command describing every option.
    pub fn command() -> Command {
        Command::new("Phantom Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Demo host replicating client-only phantom entities to simulated viewers")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("tick-ms")
                    .short('t')
                    .long("tick-ms")
                    .value_name("MILLIS")
                    .help("Tick interval in milliseconds")
                    .value_parser(clap::value_parser!(u64)),
            )
            .arg(
                Arg::new("viewers")
                    .short('v')
                    .long("viewers")
                    .value_name("COUNT")
                    .help("Number of simulated viewers to connect")
                    .value_parser(clap::value_parser!(usize)),
            )
    }

    /// Parses the process arguments.
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    /// Parses an explicit argument list, the first item being the binary name.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            tick_ms: matches.get_one::<u64>("tick-ms").copied(),
            viewers: matches.get_one::<usize>("viewers").copied(),
        }
    }
}
