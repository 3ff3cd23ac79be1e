use std::fmt::{self, Display, Formatter};

use regex::Regex;

use crate::error::AocError;

/// Upstream path the proxy is willing to fetch. Only per-year leaderboard and
/// day resources are reachable, which keeps the proxy from being used as an
/// open relay towards adventofcode.com with someone's session cookie.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn parse(raw: &str) -> Result<Self, AocError> {
        lazy_static! {
            static ref RE_ALLOWED: Regex = Regex::new(r"^/\d{4}/(leaderboard|day)/.*$").unwrap();
        }
        let raw = raw.trim();
        let path = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{}", raw)
        };
        if path == "/" {
            return Err(AocError::InvalidPath(raw.to_string()));
        }
        if !RE_ALLOWED.is_match(&path) {
            return Err(AocError::PathNotAllowed(path));
        }
        Ok(ResourcePath(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
