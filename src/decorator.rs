//! Deferred wrapper construction and its TOML configuration.
//!
//! A [`Decorator`] captures the file argument and open options up front and
//! applies them to callables later, so one configuration can wrap many
//! functions. The same settings can be read from a TOML document through
//! [`DecoratorConfig`], which keeps one table per decorated callable:
//!
//! ```toml
//! [copy]
//! filearg = "src"
//! mode = "rb"
//! ```

use std::fmt;
use std::rc::Rc;

use log::debug;
use serde::Deserialize;

use crate::error::WrapResult;
use crate::function::Described;
use crate::handle::{FsOpener, Opener};
use crate::options::{OpenConfig, OptionValue};
use crate::signature::FileArg;
use crate::wrapper::Wrapper;

/// Decorator settings as written in TOML.
///
/// Every key other than `filearg` is an open option and is validated when the
/// decorator is applied.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoratorConfig {
    /// Index or name of the file argument; defaults to the first parameter.
    pub filearg: Option<toml::Value>,
    /// Options forwarded to the opener.
    #[serde(flatten)]
    pub open: toml::Table,
}

impl DecoratorConfig {
    /// Parses a standalone settings table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WrapError::Config`] when the document is not valid
    /// TOML or does not match the expected shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnfn::{DecoratorConfig, FileArg};
    ///
    /// let config = DecoratorConfig::from_toml_str("filearg = 1\nmode = \"w\"\n")?;
    /// assert_eq!(config.file_arg()?, FileArg::Index(1));
    /// assert!(config.open_config()?.mode().writable());
    /// # Ok::<(), fnfn::WrapError>(())
    /// ```
    pub fn from_toml_str(source: &str) -> WrapResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads the table named `section` from a larger document.
    ///
    /// A missing table yields the defaults.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::from_toml_str`].
    pub fn from_section(source: &str, section: &str) -> WrapResult<Self> {
        let mut document: toml::Table = toml::from_str(source)?;
        match document.remove(section) {
            Some(table) => Ok(table.try_into::<Self>()?),
            None => {
                debug!("no `[{section}]` table; using default decorator settings");
                Ok(Self::default())
            }
        }
    }

    /// The configured file argument.
    ///
    /// # Errors
    ///
    /// Returns [`crate::WrapError::InvalidFileArgType`] when `filearg` is
    /// neither a non-negative integer nor a string.
    pub fn file_arg(&self) -> WrapResult<FileArg> {
        self.filearg
            .as_ref()
            .map_or_else(|| Ok(FileArg::default()), FileArg::try_from)
    }

    /// The configured open options, validated.
    ///
    /// # Errors
    ///
    /// Fails like [`OpenConfig::from_toml_table`].
    pub fn open_config(&self) -> WrapResult<OpenConfig> {
        OpenConfig::from_toml_table(&self.open)
    }
}

/// Builds wrappers from a fixed file argument and set of open options.
///
/// # Examples
///
/// ```
/// use fnfn::{Arguments, CallError, Decorator, Function, Signature};
///
/// let decorator = Decorator::new().filearg("dst").option("mode", "w");
/// let save = Function::new(
///     "save",
///     Signature::new().positional("src").positional("dst"),
///     |_args: Arguments| Ok::<_, CallError>(()),
/// );
/// let wrapper = decorator.apply(save)?;
/// assert_eq!(wrapper.position(), Some(1));
/// # Ok::<(), fnfn::WrapError>(())
/// ```
#[derive(Clone)]
pub struct Decorator {
    filearg: FileArg,
    options: Vec<(String, OptionValue)>,
    opener: Rc<dyn Opener>,
}

impl Decorator {
    /// A decorator for the first parameter with no options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filearg: FileArg::default(),
            options: Vec::new(),
            opener: Rc::new(FsOpener),
        }
    }

    /// Builds a decorator from parsed settings.
    ///
    /// # Errors
    ///
    /// Returns an error when `filearg` has the wrong type or an option value
    /// has no counterpart. Option names are checked by [`Self::apply`].
    pub fn from_config(config: &DecoratorConfig) -> WrapResult<Self> {
        let options = config
            .open
            .iter()
            .map(|(name, value)| {
                OptionValue::try_from((name.as_str(), value)).map(|parsed| (name.clone(), parsed))
            })
            .collect::<WrapResult<Vec<_>>>()?;
        Ok(Self {
            filearg: config.file_arg()?,
            options,
            ..Self::new()
        })
    }

    /// Parses settings with [`DecoratorConfig::from_toml_str`].
    ///
    /// # Errors
    ///
    /// Fails like [`DecoratorConfig::from_toml_str`] and [`Self::from_config`].
    pub fn from_toml_str(source: &str) -> WrapResult<Self> {
        Self::from_config(&DecoratorConfig::from_toml_str(source)?)
    }

    /// Sets the file argument.
    #[must_use]
    pub fn filearg(mut self, filearg: impl Into<FileArg>) -> Self {
        self.filearg = filearg.into();
        self
    }

    /// Adds an open option. Later values replace earlier ones.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        let option = name.into();
        self.options.retain(|(existing, _)| *existing != option);
        self.options.push((option, value.into()));
        self
    }

    /// Opens files through `opener` instead of the filesystem.
    #[must_use]
    pub fn opener(mut self, opener: Rc<dyn Opener>) -> Self {
        self.opener = opener;
        self
    }

    /// The file argument this decorator targets.
    #[must_use]
    pub const fn target(&self) -> &FileArg {
        &self.filearg
    }

    /// Wraps `original`.
    ///
    /// # Errors
    ///
    /// Option errors are reported before file-argument errors; see
    /// [`OpenConfig::from_options`] and [`Wrapper::new`].
    pub fn apply<F: Described>(&self, original: F) -> WrapResult<Wrapper<F>> {
        let config = OpenConfig::from_options(self.options.iter().cloned())?;
        Wrapper::with_opener(original, self.filearg.clone(), config, Rc::clone(&self.opener))
    }
}

impl Default for Decorator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorator")
            .field("filearg", &self.filearg)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Wraps `original` so its first parameter also accepts filenames.
///
/// # Errors
///
/// Fails when `original` declares no positional parameter.
pub fn wrap<F: Described>(original: F) -> WrapResult<Wrapper<F>> {
    Decorator::new().apply(original)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CallError, ErrorKind};
    use crate::function::{Arguments, Function};
    use crate::signature::Signature;
    use rstest::{fixture, rstest};

    #[fixture]
    fn copy() -> Function<(), CallError> {
        Function::new(
            "copy",
            Signature::new().positional("src").positional("dst"),
            |_args: Arguments| Ok(()),
        )
    }

    #[rstest]
    fn wrap_targets_the_first_parameter(copy: Function<(), CallError>) {
        let wrapper = wrap(copy).expect("copy has parameters");

        assert_eq!(wrapper.filearg(), "src");
        assert_eq!(wrapper.open_config(), &OpenConfig::default());
    }

    #[rstest]
    fn decorators_apply_to_many_callables(copy: Function<(), CallError>) {
        let decorator = Decorator::new().filearg("dst").option("mode", "w");

        let first = decorator.apply(copy.clone()).expect("dst exists");
        let second = decorator.apply(copy).expect("dst exists");

        assert_eq!(first.position(), Some(1));
        assert_eq!(first.open_config(), second.open_config());
        assert!(first.open_config().mode().writable());
    }

    #[rstest]
    fn later_options_replace_earlier_ones() {
        let decorator = Decorator::new().option("mode", "w").option("mode", "rb");

        assert_eq!(format!("{decorator:?}").matches("mode").count(), 1);
    }

    #[rstest]
    fn option_errors_win_over_file_argument_errors(copy: Function<(), CallError>) {
        let error = Decorator::new()
            .filearg(9)
            .option("file", "x")
            .apply(copy)
            .expect_err("both settings are wrong");

        assert_eq!(error.kind(), ErrorKind::Value);
    }

    #[rstest]
    fn reads_settings_from_toml(copy: Function<(), CallError>) {
        let decorator = Decorator::from_toml_str("filearg = \"dst\"\nmode = \"ab\"\nbuffering = 0\n")
            .expect("settings parse");

        let wrapper = decorator.apply(copy).expect("settings are valid");

        assert_eq!(wrapper.filearg(), "dst");
        assert!(wrapper.open_config().mode().is_binary());
        assert_eq!(wrapper.open_config().buffering(), 0);
    }

    #[rstest]
    #[case("filearg = true\n", ErrorKind::Type)]
    #[case("filearg = -2\n", ErrorKind::Type)]
    #[case("mode = [\"r\"]\n", ErrorKind::Value)]
    #[case("filearg = \n", ErrorKind::Config)]
    fn rejects_malformed_settings(#[case] source: &str, #[case] kind: ErrorKind) {
        let error = Decorator::from_toml_str(source).expect_err("settings are malformed");

        assert_eq!(error.kind(), kind);
    }

    #[rstest]
    fn sections_pick_one_table() {
        let source = "[copy]\nfilearg = 1\n\n[load]\nfilearg = \"path\"\nencoding = \"latin-1\"\n";

        let load = DecoratorConfig::from_section(source, "load").expect("document parses");
        let missing = DecoratorConfig::from_section(source, "save").expect("document parses");

        assert_eq!(load.file_arg().expect("string filearg"), FileArg::from("path"));
        assert!(load.open.contains_key("encoding"));
        assert_eq!(missing, DecoratorConfig::default());
    }
}
