use std::sync::Arc;

use crate::{http::Request, Result};

/// A trait for the HTTP protocol. Implementors accept a `Request` wrapping
/// the URL and headers and either talk to a remote server or replay canned
/// responses for testing purposes.
///
/// `Err` is reserved for transport failures (connection refused, timeouts,
/// broken bodies). Any HTTP status, successful or not, is an `Ok` response
/// and it is up to the caller to interpret it.
pub trait HttpRunner {
    type Response;
    fn run(&self, cmd: &Request) -> Result<Self::Response>;
}

impl<T: HttpRunner + ?Sized> HttpRunner for Arc<T> {
    type Response = T::Response;

    fn run(&self, cmd: &Request) -> Result<Self::Response> {
        self.as_ref().run(cmd)
    }
}

/// Adapts lower level HTTP outputs to a common Response.
#[derive(Clone, Debug, Builder)]
pub struct HttpResponse {
    #[builder(default)]
    pub status: u16,
    /// Reason phrase of the status line, e.g. "Forbidden"
    #[builder(setter(into), default)]
    pub status_text: String,
    #[builder(setter(into), default)]
    pub body: String,
}

impl HttpResponse {
    pub fn builder() -> HttpResponseBuilder {
        HttpResponseBuilder::default()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
