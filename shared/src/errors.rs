//! Shared error types for the container test environment toolkit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Invalid container state record: {message}")]
    InvalidStateRecord { message: String },

    #[error("Invalid byte quantity: {input}")]
    InvalidByteSize { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
