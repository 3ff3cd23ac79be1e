use std::fmt::Display;

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AocError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Upstream error: {status} {status_text}")]
    UpstreamError {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("HTTP transport error: {0}")]
    TransportError(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Path not allowed: {0}")]
    PathNotAllowed(String),
    #[error("Time conversion error: {0}")]
    TimeConversionError(String),
}

impl AocError {
    /// Upstream HTTP status code, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AocError::UpstreamError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub trait AddContext<T, E>: Context<T, E> {
    fn err_context<C: Display + Send + Sync + 'static>(self, msg: C) -> Result<T, anyhow::Error>
    where
        Self: Sized,
    {
        self.with_context(|| msg.to_string())
    }
}

impl<U, T, E> AddContext<T, E> for U where U: Context<T, E> {}

pub fn gen<T: AsRef<str>>(msg: T) -> anyhow::Error {
    anyhow!(msg.as_ref().to_string())
}
