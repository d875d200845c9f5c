//! Harness error types

use controller::ControllerError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Environment error: {0}")]
    Controller(#[from] ControllerError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Wiremock at {url} failed: {message}")]
    Wiremock { url: String, message: String },

    #[error("{what} not ready within {timeout:?}")]
    NotReady { what: String, timeout: Duration },

    #[error("No active session: {operation} requires a started environment")]
    NoSession { operation: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    pub fn wiremock(url: impl Into<String>, message: impl Into<String>) -> Self {
        HarnessError::Wiremock {
            url: url.into(),
            message: message.into(),
        }
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
