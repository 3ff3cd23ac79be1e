use std::path::PathBuf;

use clap::Parser;

use crate::error::AocError;
use crate::time::Seconds;

#[derive(Parser)]
#[command(
    name = "aocp",
    about = "Fetch Advent of Code leaderboards and puzzle resources through a TTL cache"
)]
struct Args {
    /// Resource paths to fetch, e.g. /2025/leaderboard/private/view/1234.json
    #[clap(required = true, value_name = "PATH")]
    pub paths: Vec<String>,
    /// Config file. Defaults to ~/.config/aocp/config.toml when present
    #[clap(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Cache time-to-live, e.g. 900, 15m, 1h. Overrides the config file
    #[clap(long, value_name = "DURATION", value_parser = parse_duration)]
    pub ttl: Option<Seconds>,
    /// Do not cache anything. Every path goes upstream
    #[clap(long)]
    pub no_cache: bool,
    /// Share one upstream call between concurrent misses on the same path
    #[clap(long)]
    pub single_flight: bool,
    /// Print cache statistics to stderr when done
    #[clap(long)]
    pub stats: bool,
    /// Verbose mode. Logs cache hits, misses and upstream errors
    #[clap(long, short)]
    pub verbose: bool,
}

fn parse_duration(value: &str) -> Result<Seconds, AocError> {
    Seconds::try_from(value)
}

/// Options for a run, decoupled from clap so they can be built in tests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliArgs {
    pub paths: Vec<String>,
    pub config: Option<PathBuf>,
    pub ttl: Option<Seconds>,
    pub no_cache: bool,
    pub single_flight: bool,
    pub stats: bool,
    pub verbose: bool,
}

impl From<Args> for CliArgs {
    fn from(args: Args) -> Self {
        CliArgs {
            paths: args.paths,
            config: args.config,
            ttl: args.ttl,
            no_cache: args.no_cache,
            single_flight: args.single_flight,
            stats: args.stats,
            verbose: args.verbose,
        }
    }
}

pub fn parse_cli() -> CliArgs {
    Args::parse().into()
}

pub fn parse_cli_from<I, T>(args: I) -> Result<CliArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Args::try_parse_from(args).map(|args| args.into())
}
