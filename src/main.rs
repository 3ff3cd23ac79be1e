use std::{path::Path, sync::Arc};

use aocp::{
    aoc::Fetcher,
    cache::{Cache, InMemoryCache, NoCache},
    cli::{parse_cli, CliArgs},
    config::{Config, ConfigProperties},
    http::Client,
    resource::ResourcePath,
    Result,
};
use env_logger::Env;

const CONFIG_PATH: &str = ".config/aocp/config.toml";

fn main() -> Result<()> {
    let cli_args = parse_cli();
    // RUST_LOG still wins over the verbose flag
    let level = if cli_args.verbose { "info" } else { "warn" };
    env_logger::init_from_env(Env::default().default_filter_or(level));
    let config = Arc::new(read_config(&cli_args)?);
    let client = Client::new(config.http_timeout());
    if cli_args.no_cache {
        let fetcher = Fetcher::new(NoCache, client, config);
        return execute(&cli_args, &fetcher);
    }
    let cache = Arc::new(InMemoryCache::new(config.cache_ttl()));
    let _sweeper = cache.start_sweeper();
    let fetcher = Fetcher::new(cache, client, config);
    execute(&cli_args, &fetcher)
}

fn read_config(cli_args: &CliArgs) -> Result<Config> {
    let config = match &cli_args.config {
        Some(path) => Config::load(path)?,
        None => match std::env::var("HOME") {
            Ok(home_dir) if Path::new(&home_dir).join(CONFIG_PATH).exists() => {
                Config::load(Path::new(&home_dir).join(CONFIG_PATH))?
            }
            _ => Config::default().with_env(),
        },
    };
    let config = match cli_args.ttl {
        Some(ttl) => config.with_cache_ttl(ttl),
        None => config,
    };
    let single_flight = cli_args.single_flight || config.single_flight();
    Ok(config.with_single_flight(single_flight))
}

fn execute<C: Cache + Sync>(
    cli_args: &CliArgs,
    fetcher: &Fetcher<C, Client, Arc<Config>>,
) -> Result<()> {
    let paths = cli_args
        .paths
        .iter()
        .map(|raw_path| ResourcePath::parse(raw_path))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    // Paths are fetched concurrently; output keeps the command line order
    // and stops at the first failure.
    for result in fetcher.fetch_all(&paths) {
        println!("{}", serde_json::to_string(&result?)?);
    }
    if cli_args.stats {
        let stats = fetcher.cache().stats();
        eprintln!(
            "cache: {} hits, {} misses, {} keys",
            stats.hits, stats.misses, stats.keys
        );
    }
    Ok(())
}
