//! Error types raised while building wrappers and while invoking them.
//!
//! Construction problems surface as [`WrapError`] and abort wrapper creation
//! outright. Call-time problems surface as [`CallError`], which every wrapped
//! callable's error type must absorb through `From<CallError>` so that errors
//! raised by the original function propagate unchanged.

use std::io;

use thiserror::Error;

/// Broad classification of an error, mirroring the familiar runtime error
/// families callers tend to branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value had the wrong type or shape.
    Type,
    /// A value had the right type but an unacceptable content.
    Value,
    /// A positional index fell outside the declared parameters.
    Index,
    /// A name matched none of the declared parameters.
    Name,
    /// The platform failed to open or close a file.
    Io,
    /// A configuration document could not be parsed.
    Config,
}

/// Errors raised while constructing a [`crate::Wrapper`].
#[derive(Debug, Error)]
pub enum WrapError {
    /// An option is not accepted by the file-open primitive, or its value is
    /// unusable.
    #[error("invalid open option `{option}`: {reason}")]
    InvalidOption {
        /// Name of the rejected option.
        option: String,
        /// Why the option was rejected.
        reason: String,
    },

    /// The option names the file argument itself, which the wrapper supplies.
    #[error("`{option}` is reserved for the file argument and cannot be configured")]
    ReservedOption {
        /// Name of the reserved option.
        option: String,
    },

    /// A positional file argument index lies beyond the declared parameters.
    #[error(
        "argument list index out of range: `{function}` declares {available} positional parameters, got index {index}"
    )]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of declared positional parameters.
        available: usize,
        /// Name of the function being wrapped.
        function: String,
    },

    /// A named file argument matches no declared parameter.
    #[error("`{name}` is not a valid argument for the function `{function}`")]
    UnknownArgument {
        /// Requested parameter name.
        name: String,
        /// Name of the function being wrapped.
        function: String,
    },

    /// The file argument specifier is neither a non-negative index nor a name.
    #[error("{found} has incorrect type for a file argument specifier")]
    InvalidFileArgType {
        /// Description of the rejected specifier.
        found: String,
    },

    /// The decorator configuration document could not be parsed.
    #[error("invalid decorator configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl WrapError {
    /// Returns the error family this construction failure belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnfn::{ErrorKind, WrapError};
    ///
    /// let error = WrapError::UnknownArgument {
    ///     name: "nonexistent".to_owned(),
    ///     function: "copy".to_owned(),
    /// };
    /// assert_eq!(error.kind(), ErrorKind::Name);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOption { .. } | Self::ReservedOption { .. } => ErrorKind::Value,
            Self::IndexOutOfRange { .. } => ErrorKind::Index,
            Self::UnknownArgument { .. } => ErrorKind::Name,
            Self::InvalidFileArgType { .. } => ErrorKind::Type,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Errors raised by a wrapper while it prepares or releases a file.
#[derive(Debug, Error)]
pub enum CallError {
    /// The designated argument is neither an open file nor a usable filename.
    #[error("unrecognised type for filename or file object for `{argument}`")]
    InvalidFileArgument {
        /// Name of the designated parameter.
        argument: String,
    },

    /// The platform refused to open the named file.
    #[error("failed to open {name}")]
    Open {
        /// Display form of the filename.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Flushing or closing an opened file failed.
    #[error("failed to close {name}")]
    Close {
        /// Display form of the filename.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl CallError {
    /// Returns the error family this call-time failure belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFileArgument { .. } => ErrorKind::Type,
            Self::Open { .. } | Self::Close { .. } => ErrorKind::Io,
        }
    }
}

/// Convenience alias for wrapper construction results.
pub type WrapResult<T> = Result<T, WrapError>;
