use crate::error::AocError;
use crate::io::{HttpResponse, HttpRunner};
use crate::time::Seconds;
use crate::Result;
use std::collections::{hash_map, HashMap};
use std::time::Duration;
use ureq::Agent;

/// Blocking HTTP client backed by a shared `ureq` agent. Connections are
/// pooled by the agent so a single `Client` should be reused across fetches.
pub struct Client {
    agent: Agent,
}

impl Client {
    /// `timeout` bounds the whole request, from connect to the end of the
    /// body. Hitting it is reported as a transport error. Zero disables it.
    pub fn new(timeout: Seconds) -> Self {
        let timeout = match *timeout {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        };
        let config = Agent::config_builder()
            // Non-2xx responses are still responses. The fetcher decides
            // what they mean.
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        Client {
            agent: config.into(),
        }
    }
}

impl HttpRunner for Client {
    type Response = HttpResponse;

    fn run(&self, cmd: &Request) -> Result<Self::Response> {
        // set incoming requests headers
        let ureq_req = cmd
            .headers()
            .iter()
            .fold(self.agent.get(cmd.url()), |req, (key, value)| {
                req.header(key.as_str(), value.as_str())
            });
        let mut response = ureq_req
            .call()
            .map_err(|err| AocError::TransportError(err.to_string()))?;
        let status = response.status();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|err| AocError::TransportError(err.to_string()))?;
        let response = HttpResponse::builder()
            .status(status.as_u16())
            .status_text(status.canonical_reason().unwrap_or_default())
            .body(body)
            .build()?;
        Ok(response)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Headers(HashMap::new())
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.0.get(key)
    }

    pub fn iter(&self) -> hash_map::Iter<String, String> {
        self.0.iter()
    }
}

/// An outbound GET. The proxy never sends anything else upstream.
#[derive(Clone, Debug)]
pub struct Request {
    url: String,
    headers: Headers,
}

impl Request {
    pub fn get(url: &str) -> Self {
        Request {
            url: url.to_string(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.set_header(key, value);
        self
    }

    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.set(key, value);
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }
}
