//! Config file parsing and validation.

use crate::api_defaults::{
    AOC_BASE_URL, DEFAULT_CACHE_TTL_SECONDS, DEFAULT_HTTP_TIMEOUT_SECONDS, SESSION_ENV_VAR,
};
use crate::error::{AddContext, AocError};
use crate::log_warn;
use crate::time::Seconds;
use crate::Result;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

pub trait ConfigProperties {
    /// Session cookie issued by adventofcode.com. `None` when not configured.
    fn session_id(&self) -> Option<&str>;
    fn base_url(&self) -> &str {
        AOC_BASE_URL
    }
    fn cache_ttl(&self) -> Seconds {
        Seconds::new(DEFAULT_CACHE_TTL_SECONDS)
    }
    fn http_timeout(&self) -> Seconds {
        Seconds::new(DEFAULT_HTTP_TIMEOUT_SECONDS)
    }
    /// Whether concurrent misses on the same path share one upstream call.
    fn single_flight(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    session_id: Option<String>,
    base_url: String,
    cache_ttl: Seconds,
    http_timeout: Seconds,
    single_flight: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            session_id: None,
            base_url: AOC_BASE_URL.to_string(),
            cache_ttl: Seconds::new(DEFAULT_CACHE_TTL_SECONDS),
            http_timeout: Seconds::new(DEFAULT_HTTP_TIMEOUT_SECONDS),
            single_flight: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    session_id: Option<String>,
    base_url: Option<String>,
    cache_ttl: Option<DurationValue>,
    http_timeout: Option<DurationValue>,
    single_flight: Option<bool>,
}

/// Durations accept either a number of seconds or a formatted string such as
/// "15m" or "2 hours".
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationValue {
    Seconds(u64),
    Formatted(String),
}

impl DurationValue {
    fn to_seconds(&self) -> std::result::Result<Seconds, AocError> {
        match self {
            DurationValue::Seconds(seconds) => Ok(Seconds::new(*seconds)),
            DurationValue::Formatted(fmt) => Seconds::try_from(fmt.as_str()),
        }
    }
}

impl Config {
    pub fn new<T: Read>(mut reader: T) -> Result<Self> {
        let mut config_data = String::new();
        reader.read_to_string(&mut config_data)?;
        let file: ConfigFile = toml::from_str(&config_data).map_err(|err| {
            AocError::ConfigurationError(format!("Invalid config file: {}", err))
        })?;
        let defaults = Config::default();
        let cache_ttl = match file.cache_ttl {
            Some(ttl) => ttl.to_seconds()?,
            None => defaults.cache_ttl,
        };
        let http_timeout = match file.http_timeout {
            Some(timeout) => timeout.to_seconds()?,
            None => defaults.http_timeout,
        };
        let base_url = file
            .base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        Ok(Config {
            session_id: non_empty(file.session_id),
            base_url,
            cache_ttl,
            http_timeout,
            single_flight: file.single_flight.unwrap_or(defaults.single_flight),
        })
    }

    /// Reads the config file at `path`, then lets the environment override
    /// the session id.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).err_context(AocError::ConfigurationError(format!(
            "Cannot open config file {}",
            path.display()
        )))?;
        Ok(Config::new(f)?.with_env())
    }

    /// Applies `AOC_SESSION_ID` from the environment, if set, over the
    /// configured session id and warns when no session is configured at all.
    pub fn with_env(self) -> Self {
        let config = match non_empty(std::env::var(SESSION_ENV_VAR).ok()) {
            Some(session_id) => self.with_session_id(session_id),
            None => self,
        };
        if config.session_id.is_none() {
            log_warn!(
                "Warning: {} is not set. API calls will likely fail.",
                SESSION_ENV_VAR
            );
        }
        config
    }

    pub fn with_session_id<S: Into<String>>(self, session_id: S) -> Self {
        Config {
            session_id: non_empty(Some(session_id.into())),
            ..self
        }
    }

    pub fn with_base_url(self, base_url: &str) -> Self {
        Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self
        }
    }

    pub fn with_cache_ttl(self, cache_ttl: Seconds) -> Self {
        Config { cache_ttl, ..self }
    }

    pub fn with_single_flight(self, single_flight: bool) -> Self {
        Config {
            single_flight,
            ..self
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ConfigProperties for Config {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cache_ttl(&self) -> Seconds {
        self.cache_ttl
    }

    fn http_timeout(&self) -> Seconds {
        self.http_timeout
    }

    fn single_flight(&self) -> bool {
        self.single_flight
    }
}

impl ConfigProperties for Arc<Config> {
    fn session_id(&self) -> Option<&str> {
        self.as_ref().session_id()
    }

    fn base_url(&self) -> &str {
        self.as_ref().base_url()
    }

    fn cache_ttl(&self) -> Seconds {
        self.as_ref().cache_ttl()
    }

    fn http_timeout(&self) -> Seconds {
        self.as_ref().http_timeout()
    }

    fn single_flight(&self) -> bool {
        self.as_ref().single_flight()
    }
}
