//! Parameter descriptors and file-argument resolution.
//!
//! A [`Signature`] is declared once alongside a callable and describes its
//! parameters as plain data. Wrappers resolve their [`FileArg`] against it at
//! construction time and never consult it again per call.

use std::fmt;

use crate::error::{WrapError, WrapResult};

/// How a parameter may be supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// Positional, or by keyword using its name.
    Positional,
    /// By keyword only.
    KeywordOnly,
}

/// A single declared parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    kind: ParameterKind,
}

impl Parameter {
    /// Declares a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter kind.
    #[must_use]
    pub const fn kind(&self) -> ParameterKind {
        self.kind
    }
}

/// Ordered parameter list of a callable.
///
/// # Examples
///
/// ```
/// use fnfn::Signature;
///
/// let signature = Signature::new().positional("src").positional("dst").keyword_only("mode");
/// assert_eq!(signature.positional_names().collect::<Vec<_>>(), ["src", "dst"]);
/// assert_eq!(signature.to_string(), "(src, dst, *, mode)");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    /// Creates an empty signature.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    /// Appends a positional parameter.
    #[must_use]
    pub fn positional(mut self, name: impl Into<String>) -> Self {
        self.parameters
            .push(Parameter::new(name, ParameterKind::Positional));
        self
    }

    /// Appends a keyword-only parameter.
    #[must_use]
    pub fn keyword_only(mut self, name: impl Into<String>) -> Self {
        self.parameters
            .push(Parameter::new(name, ParameterKind::KeywordOnly));
        self
    }

    /// All parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Names of positional parameters in order.
    pub fn positional_names(&self) -> impl Iterator<Item = &str> {
        self.names_of(ParameterKind::Positional)
    }

    /// Names of keyword-only parameters in order.
    pub fn keyword_only_names(&self) -> impl Iterator<Item = &str> {
        self.names_of(ParameterKind::KeywordOnly)
    }

    fn names_of(&self, kind: ParameterKind) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(move |parameter| parameter.kind == kind)
            .map(Parameter::name)
    }

    /// Resolves `filearg` to a declared parameter of the function `function`.
    ///
    /// # Errors
    ///
    /// Returns [`WrapError::IndexOutOfRange`] when an index exceeds the
    /// positional parameters and [`WrapError::UnknownArgument`] when a name
    /// matches no parameter.
    pub fn resolve(&self, filearg: &FileArg, function: &str) -> WrapResult<ResolvedArg> {
        let name = match filearg {
            FileArg::Index(index) => {
                let available = self.positional_names().count();
                self.positional_names()
                    .nth(*index)
                    .ok_or_else(|| WrapError::IndexOutOfRange {
                        index: *index,
                        available,
                        function: function.to_owned(),
                    })?
            }
            FileArg::Name(name) => name.as_str(),
        };

        if let Some(index) = self.positional_names().position(|candidate| candidate == name) {
            return Ok(ResolvedArg::Positional {
                name: name.to_owned(),
                index,
            });
        }
        if self.keyword_only_names().any(|candidate| candidate == name) {
            return Ok(ResolvedArg::KeywordOnly {
                name: name.to_owned(),
            });
        }
        Err(WrapError::UnknownArgument {
            name: name.to_owned(),
            function: function.to_owned(),
        })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered: Vec<&str> = self.positional_names().collect();
        if self.keyword_only_names().next().is_some() {
            rendered.push("*");
            rendered.extend(self.keyword_only_names());
        }
        write!(f, "({})", rendered.join(", "))
    }
}

/// Identifies the parameter that receives a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileArg {
    /// Index into the positional parameters.
    Index(usize),
    /// Parameter name, positional or keyword-only.
    Name(String),
}

impl Default for FileArg {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl From<usize> for FileArg {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for FileArg {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for FileArg {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl TryFrom<&toml::Value> for FileArg {
    type Error = WrapError;

    fn try_from(value: &toml::Value) -> Result<Self, Self::Error> {
        match value {
            toml::Value::String(name) => Ok(Self::Name(name.clone())),
            toml::Value::Integer(index) => {
                usize::try_from(*index)
                    .map(Self::Index)
                    .map_err(|_| WrapError::InvalidFileArgType {
                        found: format!("negative index {index}"),
                    })
            }
            other => Err(WrapError::InvalidFileArgType {
                found: format!("{} `{other}`", other.type_str()),
            }),
        }
    }
}

/// A file argument resolved against a [`Signature`].
///
/// Either the parameter has a position, or it is keyword-only; never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedArg {
    /// A positional parameter, also reachable by keyword.
    Positional {
        /// Parameter name.
        name: String,
        /// Index among the positional parameters.
        index: usize,
    },
    /// A keyword-only parameter.
    KeywordOnly {
        /// Parameter name.
        name: String,
    },
}

impl ResolvedArg {
    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Positional { name, .. } | Self::KeywordOnly { name } => name,
        }
    }

    /// Positional index, `None` when keyword-only.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        match self {
            Self::Positional { index, .. } => Some(*index),
            Self::KeywordOnly { .. } => None,
        }
    }
}
