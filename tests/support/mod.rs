//! Shared test support for the integration suites.
//!
//! [`MemoryOpener`] serves files from memory and remembers every handle it
//! hands out, so tests can check how often a file was opened and whether it
//! was closed again. [`TestError`] is the error type of the test callables.
//! Suites that only need one helper include its file directly with `#[path]`.

pub mod error;
pub mod opener;

pub use error::TestError;
pub use opener::MemoryOpener;
