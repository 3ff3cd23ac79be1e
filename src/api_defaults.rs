// Upstream Advent of Code service. Paths handed to the fetcher are appended
// verbatim, so no trailing slash.
pub const AOC_BASE_URL: &str = "https://adventofcode.com";

// Advent of Code asks automated tools to identify themselves so the operator
// can be contacted if the traffic misbehaves.
pub const USER_AGENT: &str = "github.com/nulzo/advent-leaderboard by nulzo";

// Environment variable holding the session cookie issued by adventofcode.com
pub const SESSION_ENV_VAR: &str = "AOC_SESSION_ID";

// 15 minutes. Advent of Code asks that private leaderboards are not polled
// more often than that.
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 15 * 60;

// The background sweeper runs every TTL * SWEEP_FACTOR.
pub const SWEEP_FACTOR: f64 = 0.2;

// Lower bound for the sweep interval, in seconds.
pub const MIN_SWEEP_INTERVAL_SECONDS: u64 = 1;

// Global timeout for a single upstream request, connect + read.
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
