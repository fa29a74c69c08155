//! Error type returned by test callables.

use std::io;

use fnfn::CallError;
use thiserror::Error;

/// Errors raised by test callables.
#[derive(Debug, Error)]
pub enum TestError {
    /// A wrapper failure.
    #[error(transparent)]
    Call(#[from] CallError),
    /// A failure inside the callable's own body.
    #[error("{0}")]
    Body(String),
}

impl From<io::Error> for TestError {
    fn from(error: io::Error) -> Self {
        Self::Body(error.to_string())
    }
}
