//! Cached access to the Advent of Code API.
//!
//! A `Fetcher` resolves a resource path either from the cache or with exactly
//! one authenticated GET against adventofcode.com. Successful payloads are
//! cached before they are returned; failures never touch the cache. Every
//! result carries provenance metadata (`cached`, `last_fetched`) so callers can
//! show how fresh the data is.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::api_defaults::{SESSION_ENV_VAR, USER_AGENT};
use crate::cache::{Cache, CacheEntry};
use crate::config::ConfigProperties;
use crate::error::{self, AocError};
use crate::http::Request;
use crate::io::{HttpResponse, HttpRunner};
use crate::time::{Clock, Milliseconds, SystemClock};
use crate::{json_loads, log_debug, log_error, log_info, Result};

const META_KEY: &str = "_meta";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Meta {
    pub cached: bool,
    pub last_fetched: Milliseconds,
}

/// Payload plus provenance. Serializes as the payload object with an extra
/// `_meta` member. Payloads that are not JSON objects are wrapped as
/// `{"data": <payload>, "_meta": {...}}`.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchResult {
    pub data: Arc<Value>,
    pub meta: Meta,
}

impl FetchResult {
    fn from_cache(entry: CacheEntry) -> Self {
        FetchResult {
            data: entry.value,
            meta: Meta {
                cached: true,
                last_fetched: entry.stored_at,
            },
        }
    }

    fn from_upstream(data: Arc<Value>, fetched_at: Milliseconds) -> Self {
        FetchResult {
            data,
            meta: Meta {
                cached: false,
                last_fetched: fetched_at,
            },
        }
    }

    pub fn to_json(&self) -> Value {
        // Serializing a Value-backed struct into a Value cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.data.as_ref() {
            Value::Object(payload) => {
                for (key, value) in payload.iter().filter(|(key, _)| key.as_str() != META_KEY) {
                    map.serialize_entry(key, value)?;
                }
            }
            payload => map.serialize_entry("data", payload)?,
        }
        map.serialize_entry(META_KEY, &self.meta)?;
        map.end()
    }
}

pub struct Fetcher<C, R, D> {
    cache: C,
    runner: R,
    config: D,
    clock: Arc<dyn Clock>,
    inflight: Mutex<HashMap<String, Arc<InFlight>>>,
}

impl<C, R, D> Fetcher<C, R, D> {
    pub fn new(cache: C, runner: R, config: D) -> Self {
        Fetcher {
            cache,
            runner,
            config,
            clock: Arc::new(SystemClock),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Fetcher { clock, ..self }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<C: Cache, R: HttpRunner<Response = HttpResponse>, D: ConfigProperties> Fetcher<C, R, D> {
    /// Returns the payload for `path`, from the cache when a live entry
    /// exists, otherwise from one upstream GET.
    pub fn fetch(&self, path: &str) -> Result<FetchResult> {
        if let Some(entry) = self.cache.get(path) {
            log_info!(
                "[CACHE HIT] {} (fetched at {})",
                path,
                entry.stored_at.to_rfc3339()
            );
            return Ok(FetchResult::from_cache(entry));
        }
        log_info!("[CACHE MISS] Fetching {}", path);
        let outcome = if self.config.single_flight() {
            self.fetch_coalesced(path)
        } else {
            self.fetch_upstream(path)
        };
        Ok(outcome?)
    }

    /// Fetches every path on its own thread and returns the outcomes in
    /// input order. Repeated paths share one upstream call when single-flight
    /// is enabled.
    pub fn fetch_all<P: AsRef<str> + Sync>(&self, paths: &[P]) -> Vec<Result<FetchResult>>
    where
        Self: Sync,
    {
        thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|path| scope.spawn(move || self.fetch(path.as_ref())))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(error::gen("fetch thread panicked")))
                })
                .collect()
        })
    }

    fn fetch_upstream(&self, path: &str) -> std::result::Result<FetchResult, AocError> {
        let session_id = self.config.session_id().ok_or_else(|| {
            AocError::ConfigurationError(format!(
                "{} is not configured on the server",
                SESSION_ENV_VAR
            ))
        })?;
        let url = format!("{}{}", self.config.base_url(), path);
        let request = Request::get(&url)
            .with_header("User-Agent", USER_AGENT)
            .with_header("Cookie", &format!("session={}", session_id));
        let response = self.runner.run(&request).map_err(|err| {
            let err = match err.downcast_ref::<AocError>() {
                Some(err) => err.clone(),
                None => AocError::TransportError(err.to_string()),
            };
            log_error!("[AOC ERROR] {}", err);
            err
        })?;
        if !response.is_success() {
            log_error!("[AOC ERROR] {} {}", response.status, response.status_text);
            return Err(AocError::UpstreamError {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            });
        }
        let data = Arc::new(decode_body(response.body));
        self.cache.set(path, data.clone());
        Ok(FetchResult::from_upstream(data, self.clock.now()))
    }

    /// Misses on a path that already has an upstream call in flight wait for
    /// that call and share its outcome instead of issuing their own.
    fn fetch_coalesced(&self, path: &str) -> std::result::Result<FetchResult, AocError> {
        let (flight, leader) = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(path) {
                Some(flight) => (flight.clone(), false),
                None => {
                    let flight = Arc::new(InFlight::default());
                    inflight.insert(path.to_string(), flight.clone());
                    (flight, true)
                }
            }
        };
        if !leader {
            log_debug!("Joining in-flight request for {}", path);
            return flight.wait();
        }
        let slot = LeaderSlot {
            registry: &self.inflight,
            path,
            flight,
            finished: false,
        };
        // A previous leader may have stored the path between our cache miss
        // and the registry lookup.
        let outcome = match self.cache.get(path) {
            Some(entry) => {
                log_debug!("{} was stored by a previous in-flight request", path);
                Ok(FetchResult::from_cache(entry))
            }
            None => self.fetch_upstream(path),
        };
        slot.finish(outcome.clone());
        outcome
    }
}

/// JSON bodies are parsed. Anything else (puzzle pages, inputs) is kept as a
/// JSON string so it can still be cached and annotated.
fn decode_body(body: String) -> Value {
    match json_loads(&body) {
        Ok(value) => value,
        Err(_) => Value::String(body),
    }
}

type Outcome = std::result::Result<FetchResult, AocError>;

#[derive(Default)]
struct InFlight {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl InFlight {
    fn complete(&self, outcome: Outcome) {
        let mut slot = lock(&self.outcome);
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut slot = lock(&self.outcome);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Registration of the caller doing the upstream call for a path. Removes
/// the registry entry and releases waiters even if the leader unwinds.
struct LeaderSlot<'a> {
    registry: &'a Mutex<HashMap<String, Arc<InFlight>>>,
    path: &'a str,
    flight: Arc<InFlight>,
    finished: bool,
}

impl LeaderSlot<'_> {
    fn finish(mut self, outcome: Outcome) {
        lock(self.registry).remove(self.path);
        self.flight.complete(outcome);
        self.finished = true;
    }
}

impl Drop for LeaderSlot<'_> {
    fn drop(&mut self) {
        if !self.finished {
            lock(self.registry).remove(self.path);
            self.flight.complete(Err(AocError::TransportError(format!(
                "in-flight request for {} was abandoned",
                self.path
            ))));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
