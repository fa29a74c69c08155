//! Argument values and the filename-or-file classification.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};

use crate::handle::FileHandle;

/// A dynamically typed argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value.
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Text string.
    Str(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Structured path.
    Path(PathBuf),
    /// An open file.
    File(FileHandle),
}

impl Value {
    /// Returns the open file held by this value.
    #[must_use]
    pub const fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Self::File(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns the text held by this value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer held by this value.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(number) => Some(*number),
            _ => None,
        }
    }

    /// Short description of the value's type, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Path(_) => "path",
            Self::File(_) => "file",
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident($convert:expr)),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Self::$variant($convert(value))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool(std::convert::identity),
    i64 => Int(std::convert::identity),
    f64 => Float(std::convert::identity),
    String => Str(std::convert::identity),
    &str => Str(str::to_owned),
    Vec<u8> => Bytes(std::convert::identity),
    &[u8] => Bytes(<[u8]>::to_vec),
    PathBuf => Path(std::convert::identity),
    &Path => Path(Path::to_path_buf),
    Utf8PathBuf => Path(Utf8PathBuf::into_std_path_buf),
    &Utf8Path => Path(|path: &Utf8Path| path.as_std_path().to_path_buf()),
    FileHandle => File(std::convert::identity),
}

/// A value that can be handed to the file-open primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileName {
    /// Text filename.
    Text(String),
    /// Byte-string filename.
    Bytes(Vec<u8>),
    /// Structured path.
    Path(PathBuf),
}

impl FileName {
    /// Returns the filesystem path named by this value.
    ///
    /// Byte strings are taken verbatim on Unix and decoded lossily elsewhere.
    #[must_use]
    pub fn to_path(&self) -> Cow<'_, Path> {
        match self {
            Self::Text(text) => Cow::Borrowed(Path::new(text)),
            Self::Path(path) => Cow::Borrowed(path.as_path()),
            Self::Bytes(bytes) => bytes_to_path(bytes),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Path(path) => path.as_os_str().is_empty(),
        }
    }
}

#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    Cow::Borrowed(Path::new(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Cow<'_, Path> {
    Cow::Owned(PathBuf::from(String::from_utf8_lossy(bytes).into_owned()))
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Outcome of inspecting the value in a file-designated slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The value is already an open file and passes through untouched.
    AlreadyOpen,
    /// The value names a file the wrapper must open.
    NeedsOpening(FileName),
    /// The value is neither.
    Invalid,
}

/// Classifies a slot value.
///
/// Filename-like values are tried first; empty names are invalid.
///
/// # Examples
///
/// ```
/// use fnfn::{Classification, FileName, Value, classify};
///
/// assert_eq!(
///     classify(&Value::from("data.txt")),
///     Classification::NeedsOpening(FileName::Text("data.txt".to_owned())),
/// );
/// assert_eq!(classify(&Value::from("")), Classification::Invalid);
/// assert_eq!(classify(&Value::Int(42)), Classification::Invalid);
/// ```
#[must_use]
pub fn classify(value: &Value) -> Classification {
    if let Some(name) = filename_of(value) {
        return if name.is_empty() {
            Classification::Invalid
        } else {
            Classification::NeedsOpening(name)
        };
    }
    match value {
        Value::File(_) => Classification::AlreadyOpen,
        _ => Classification::Invalid,
    }
}

/// Whether `value` is a non-empty filename-like value.
#[must_use]
pub fn is_valid_filename(value: &Value) -> bool {
    matches!(classify(value), Classification::NeedsOpening(_))
}

fn filename_of(value: &Value) -> Option<FileName> {
    match value {
        Value::Str(text) => Some(FileName::Text(text.clone())),
        Value::Bytes(bytes) => Some(FileName::Bytes(bytes.clone())),
        Value::Path(path) => Some(FileName::Path(path.clone())),
        _ => None,
    }
}
