//! File-open configuration forwarded to the [`crate::Opener`] collaborator.
//!
//! The recognised options mirror the usual file-open primitive: `mode`,
//! `buffering`, `encoding`, `errors` and `newline`. `file` is reserved for
//! the wrapped argument itself. Options are validated once when a wrapper is
//! built; the resulting [`OpenConfig`] is immutable and only applies to files
//! the wrapper opens on its own.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{WrapError, WrapResult};

/// Option names accepted by the file-open primitive.
pub const OPEN_OPTIONS: [&str; 5] = ["mode", "buffering", "encoding", "errors", "newline"];

/// Option name reserved for the file argument.
pub const RESERVED_OPTION: &str = "file";

/// Largest accepted `buffering` value, in bytes.
pub const MAX_BUFFERING: i64 = 64 * 1024 * 1024;

/// A single configured option value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// Explicit absence, used by `encoding`, `errors` and `newline`.
    None,
    /// Text value.
    Str(String),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl OptionValue {
    fn describe(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Str(_) => "a string",
            Self::Int(_) => "an integer",
            Self::Bool(_) => "a boolean",
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T> From<Option<T>> for OptionValue
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl TryFrom<(&str, &toml::Value)> for OptionValue {
    type Error = WrapError;

    fn try_from((option, value): (&str, &toml::Value)) -> Result<Self, Self::Error> {
        match value {
            toml::Value::String(text) => Ok(Self::Str(text.clone())),
            toml::Value::Integer(number) => Ok(Self::Int(*number)),
            toml::Value::Boolean(flag) => Ok(Self::Bool(*flag)),
            other => Err(invalid(
                option,
                format!("unsupported value type `{}`", other.type_str()),
            )),
        }
    }
}

/// Primary access requested by a mode string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// `r`: open an existing file for reading.
    Read,
    /// `w`: create or truncate a file for writing.
    Write,
    /// `a`: create a file if needed and append to it.
    Append,
    /// `x`: create a new file, failing when it exists.
    Exclusive,
}

impl Access {
    const fn letter(self) -> char {
        match self {
            Self::Read => 'r',
            Self::Write => 'w',
            Self::Append => 'a',
            Self::Exclusive => 'x',
        }
    }
}

/// Parsed form of a mode string such as `"r"`, `"wb"` or `"a+t"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mode {
    access: Access,
    update: bool,
    binary: bool,
}

impl Mode {
    /// Returns the primary access.
    #[must_use]
    pub const fn access(self) -> Access {
        self.access
    }

    /// Whether `+` requested both reading and writing.
    #[must_use]
    pub const fn is_update(self) -> bool {
        self.update
    }

    /// Whether the file is opened in binary mode.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        self.binary
    }

    /// Whether the opened file can be read.
    #[must_use]
    pub const fn readable(self) -> bool {
        matches!(self.access, Access::Read) || self.update
    }

    /// Whether the opened file can be written.
    #[must_use]
    pub const fn writable(self) -> bool {
        !matches!(self.access, Access::Read) || self.update
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            access: Access::Read,
            update: false,
            binary: false,
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut access = None;
        let mut update = false;
        let mut binary = None;

        for letter in text.chars() {
            match letter {
                'r' | 'w' | 'a' | 'x' => {
                    if access.is_some() {
                        return Err(format!("mode `{text}` requests more than one access kind"));
                    }
                    access = Some(match letter {
                        'r' => Access::Read,
                        'w' => Access::Write,
                        'a' => Access::Append,
                        _ => Access::Exclusive,
                    });
                }
                '+' if !update => update = true,
                'b' | 't' => {
                    if binary.is_some() {
                        return Err(format!("mode `{text}` cannot be both binary and text"));
                    }
                    binary = Some(letter == 'b');
                }
                _ => return Err(format!("invalid mode `{text}`")),
            }
        }

        let Some(resolved) = access else {
            return Err(format!(
                "mode `{text}` must contain exactly one of `r`, `w`, `a` or `x`"
            ));
        };

        Ok(Self {
            access: resolved,
            update,
            binary: binary.unwrap_or(false),
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.access.letter())?;
        if self.update {
            f.write_str("+")?;
        }
        if self.binary {
            f.write_str("b")?;
        }
        Ok(())
    }
}

/// Text encodings understood by [`crate::FileHandle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, the default for text handles.
    #[default]
    Utf8,
    /// Seven-bit ASCII.
    Ascii,
    /// ISO-8859-1, mapping every byte to the code point of the same value.
    Latin1,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            _ => Err(format!("unknown encoding `{text}`")),
        }
    }
}

/// How undecodable or unencodable characters are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Fail the read or write.
    #[default]
    Strict,
    /// Substitute a replacement character.
    Replace,
    /// Drop the offending data.
    Ignore,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "strict" => Ok(Self::Strict),
            "replace" => Ok(Self::Replace),
            "ignore" => Ok(Self::Ignore),
            _ => Err(format!("unknown error handler `{text}`")),
        }
    }
}

/// Newline handling for text handles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Newline {
    /// Recognise `\n`, `\r\n` and `\r`, translating them to `\n` on read and
    /// writing the platform line separator.
    #[default]
    Universal,
    /// Recognise every line ending but leave text untranslated.
    Untranslated,
    /// `\n` only.
    Lf,
    /// `\r` only.
    Cr,
    /// `\r\n` only.
    CrLf,
}

impl Newline {
    /// Returns the terminator written in place of `\n`.
    #[must_use]
    pub const fn write_terminator(self) -> &'static str {
        match self {
            Self::Universal => platform_line_separator(),
            Self::Untranslated | Self::Lf => "\n",
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }
}

const fn platform_line_separator() -> &'static str {
    if cfg!(windows) { "\r\n" } else { "\n" }
}

impl FromStr for Newline {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "" => Ok(Self::Untranslated),
            "\n" => Ok(Self::Lf),
            "\r" => Ok(Self::Cr),
            "\r\n" => Ok(Self::CrLf),
            _ => Err(format!("illegal newline value {text:?}")),
        }
    }
}

/// Validated, immutable options used whenever a wrapper opens a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenConfig {
    mode: Mode,
    buffering: i64,
    encoding: Option<Encoding>,
    errors: Option<ErrorPolicy>,
    newline: Newline,
    options: BTreeMap<String, OptionValue>,
}

impl Default for OpenConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            buffering: -1,
            encoding: None,
            errors: None,
            newline: Newline::default(),
            options: BTreeMap::new(),
        }
    }
}

impl OpenConfig {
    /// Validates a set of named options.
    ///
    /// # Errors
    ///
    /// Returns [`WrapError::ReservedOption`] for `file`, and
    /// [`WrapError::InvalidOption`] for unknown names, values of the wrong
    /// shape, and binary/text conflicts.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnfn::{OpenConfig, OptionValue};
    ///
    /// let config = OpenConfig::from_options([("mode", OptionValue::from("rb"))])?;
    /// assert!(config.mode().is_binary());
    ///
    /// let rejected = OpenConfig::from_options([("mode", OptionValue::from("rbt"))]);
    /// assert!(rejected.is_err());
    /// # Ok::<(), fnfn::WrapError>(())
    /// ```
    pub fn from_options<I, K>(options: I) -> WrapResult<Self>
    where
        I: IntoIterator<Item = (K, OptionValue)>,
        K: Into<String>,
    {
        let mut config = Self::default();

        for (key, value) in options {
            let option: String = key.into();
            config.apply(&option, &value)?;
            config.options.insert(option, value);
        }

        config.check_conflicts()?;
        Ok(config)
    }

    /// Validates the options of a TOML table.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::from_options`], and additionally when a value is a
    /// TOML type with no option counterpart (arrays, tables, floats, dates).
    pub fn from_toml_table(table: &toml::Table) -> WrapResult<Self> {
        let options = table
            .iter()
            .map(|(name, value)| {
                OptionValue::try_from((name.as_str(), value)).map(|parsed| (name.clone(), parsed))
            })
            .collect::<WrapResult<Vec<_>>>()?;
        Self::from_options(options)
    }

    fn apply(&mut self, name: &str, value: &OptionValue) -> WrapResult<()> {
        match (name, value) {
            (RESERVED_OPTION, _) => Err(WrapError::ReservedOption {
                option: name.to_owned(),
            }),
            ("mode", OptionValue::Str(text)) => {
                self.mode = text.parse().map_err(|reason| invalid(name, reason))?;
                Ok(())
            }
            ("buffering", OptionValue::Int(size)) if *size > MAX_BUFFERING => Err(invalid(
                name,
                format!("buffer size {size} exceeds the limit of {MAX_BUFFERING} bytes"),
            )),
            ("buffering", OptionValue::Int(size)) => {
                self.buffering = *size;
                Ok(())
            }
            ("encoding", OptionValue::Str(text)) => {
                self.encoding = Some(text.parse().map_err(|reason| invalid(name, reason))?);
                Ok(())
            }
            ("errors", OptionValue::Str(text)) => {
                self.errors = Some(text.parse().map_err(|reason| invalid(name, reason))?);
                Ok(())
            }
            ("newline", OptionValue::Str(text)) => {
                self.newline = text.parse().map_err(|reason| invalid(name, reason))?;
                Ok(())
            }
            ("encoding", OptionValue::None) => {
                self.encoding = None;
                Ok(())
            }
            ("errors", OptionValue::None) => {
                self.errors = None;
                Ok(())
            }
            ("newline", OptionValue::None) => {
                self.newline = Newline::Universal;
                Ok(())
            }
            (known, other) if OPEN_OPTIONS.contains(&known) => Err(invalid(
                name,
                format!("{} is not an accepted value", other.describe()),
            )),
            _ => Err(invalid(name, "not an option of the file-open primitive")),
        }
    }

    fn check_conflicts(&self) -> WrapResult<()> {
        if self.mode.is_binary() {
            for option in ["encoding", "errors", "newline"] {
                if self
                    .options
                    .get(option)
                    .is_some_and(|value| *value != OptionValue::None)
                {
                    return Err(invalid(
                        option,
                        format!("binary mode does not take {option:?}"),
                    ));
                }
            }
        } else if self.buffering == 0 {
            return Err(invalid("buffering", "text mode cannot be unbuffered"));
        }
        Ok(())
    }

    /// Parsed mode, `"r"` unless configured.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Requested buffer size: `0` for raw access, negative for the default.
    #[must_use]
    pub const fn buffering(&self) -> i64 {
        self.buffering
    }

    /// Text encoding, defaulting to UTF-8.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding.unwrap_or_default()
    }

    /// Error policy, defaulting to strict.
    #[must_use]
    pub fn errors(&self) -> ErrorPolicy {
        self.errors.unwrap_or_default()
    }

    /// Newline handling.
    #[must_use]
    pub const fn newline(&self) -> Newline {
        self.newline
    }

    /// The options exactly as supplied.
    #[must_use]
    pub const fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }
}

fn invalid(option: &str, reason: impl Into<String>) -> WrapError {
    WrapError::InvalidOption {
        option: option.to_owned(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("r", Access::Read, false, false)]
    #[case("rb", Access::Read, false, true)]
    #[case("w+", Access::Write, true, false)]
    #[case("at", Access::Append, false, false)]
    #[case("xb", Access::Exclusive, false, true)]
    #[case("br+", Access::Read, true, true)]
    fn parses_modes(
        #[case] text: &str,
        #[case] access: Access,
        #[case] update: bool,
        #[case] binary: bool,
    ) {
        let mode: Mode = text.parse().expect("mode should parse");

        assert_eq!(mode.access(), access);
        assert_eq!(mode.is_update(), update);
        assert_eq!(mode.is_binary(), binary);
    }

    #[rstest]
    #[case("")]
    #[case("rw")]
    #[case("rbt")]
    #[case("r++")]
    #[case("q")]
    #[case("b")]
    fn rejects_malformed_modes(#[case] text: &str) {
        assert!(text.parse::<Mode>().is_err(), "`{text}` should be rejected");
    }

    #[rstest]
    fn defaults_to_buffered_text_reads() {
        let config = OpenConfig::from_options(Vec::<(String, OptionValue)>::new())
            .expect("empty options are valid");

        assert_eq!(config.mode(), Mode::default());
        assert_eq!(config.buffering(), -1);
        assert_eq!(config.encoding(), Encoding::Utf8);
        assert_eq!(config.newline(), Newline::Universal);
        assert!(config.options().is_empty());
    }

    #[rstest]
    fn reserves_the_file_option() {
        let error = OpenConfig::from_options([("file", OptionValue::from("data.txt"))])
            .expect_err("file must be rejected");

        assert!(matches!(error, WrapError::ReservedOption { .. }));
        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[rstest]
    #[case("closefd", OptionValue::Bool(true))]
    #[case("opener", OptionValue::None)]
    #[case("mode", OptionValue::Int(1))]
    #[case("buffering", OptionValue::from("big"))]
    #[case("encoding", OptionValue::from("klingon"))]
    #[case("errors", OptionValue::from("shrug"))]
    #[case("newline", OptionValue::from("\n\n"))]
    fn rejects_unusable_options(#[case] name: &str, #[case] value: OptionValue) {
        let error = OpenConfig::from_options([(name, value)]).expect_err("option must be rejected");

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[rstest]
    #[case("encoding", OptionValue::from("utf-8"))]
    #[case("errors", OptionValue::from("strict"))]
    #[case("newline", OptionValue::from(""))]
    fn binary_mode_rejects_text_options(#[case] name: &str, #[case] value: OptionValue) {
        let outcome = OpenConfig::from_options([("mode", OptionValue::from("rb")), (name, value)]);

        assert!(matches!(outcome, Err(WrapError::InvalidOption { .. })));
    }

    #[rstest]
    fn binary_mode_accepts_explicit_absence() {
        let config = OpenConfig::from_options([
            ("mode", OptionValue::from("wb")),
            ("encoding", OptionValue::None),
        ])
        .expect("an absent encoding is compatible with binary mode");

        assert!(config.mode().is_binary());
    }

    #[rstest]
    fn text_mode_cannot_be_unbuffered() {
        let text = OpenConfig::from_options([("buffering", OptionValue::Int(0))]);
        let binary = OpenConfig::from_options([
            ("mode", OptionValue::from("rb")),
            ("buffering", OptionValue::Int(0)),
        ]);

        assert!(text.is_err());
        assert!(binary.is_ok());
    }

    #[rstest]
    #[case(MAX_BUFFERING + 1)]
    #[case(i64::MAX)]
    fn rejects_oversized_buffers(#[case] size: i64) {
        let error = OpenConfig::from_options([("buffering", OptionValue::Int(size))])
            .expect_err("buffer size must be rejected");

        assert!(matches!(error, WrapError::InvalidOption { ref option, .. } if option == "buffering"));
    }

    #[rstest]
    fn accepts_the_largest_buffer() {
        let config = OpenConfig::from_options([("buffering", OptionValue::Int(MAX_BUFFERING))])
            .expect("the limit itself is accepted");

        assert_eq!(config.buffering(), MAX_BUFFERING);
    }

    #[rstest]
    fn reads_options_from_toml() {
        let table: toml::Table = toml::from_str("mode = \"a\"\nencoding = \"latin-1\"\nbuffering = 64\n")
            .expect("table should parse");

        let config = OpenConfig::from_toml_table(&table).expect("options should validate");

        assert_eq!(config.mode().access(), Access::Append);
        assert_eq!(config.encoding(), Encoding::Latin1);
        assert_eq!(config.buffering(), 64);
    }

    #[rstest]
    fn rejects_toml_values_without_an_option_counterpart() {
        let table: toml::Table = toml::from_str("buffering = 1.5\n").expect("table should parse");

        assert!(OpenConfig::from_toml_table(&table).is_err());
    }

    #[rstest]
    fn mode_round_trips_through_display() {
        let mode: Mode = "b+a".parse().expect("mode should parse");

        assert_eq!(mode.to_string(), "a+b");
        assert!(mode.readable());
        assert!(mode.writable());
    }
}
