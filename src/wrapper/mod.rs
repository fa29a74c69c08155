//! Wrappers that open filenames on behalf of file-taking callables.
//!
//! A [`Wrapper`] resolves its file argument once, at construction. Each call
//! then locates the designated slot in the supplied arguments, classifies its
//! value, and either passes the arguments straight through or opens the
//! named file, substitutes the handle, and releases it after the call. For
//! generator-like callables the file is opened on the first poll of the
//! returned [`Sequence`] and held until the sequence ends.

use std::fmt;
use std::iter;
use std::rc::Rc;

use log::{debug, trace};

use crate::error::{CallError, WrapResult};
use crate::function::{Arguments, Bindable, Callable, Described, Descriptor, Output};
use crate::handle::{FsOpener, OpenedFile, Opener};
use crate::options::OpenConfig;
use crate::sequence::{Running, Sequence};
use crate::signature::{FileArg, ResolvedArg};
use crate::value::{Classification, FileName, Value, classify};

/// Where the designated value sits in one call's arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Slot {
    Positional(usize),
    Keyword(String),
}

impl Slot {
    fn value<'a>(&self, args: &'a Arguments) -> Option<&'a Value> {
        match self {
            Self::Positional(index) => args.get(*index),
            Self::Keyword(name) => args.keyword(name),
        }
    }

    fn replace(&self, args: &mut Arguments, value: Value) {
        let target = match self {
            Self::Positional(index) => args.positional_mut().get_mut(*index),
            Self::Keyword(name) => args.keywords_mut().get_mut(name),
        };
        if let Some(current) = target {
            *current = value;
        }
    }
}

/// A callable that accepts filenames where `F` expects an open file.
pub struct Wrapper<F> {
    original: Rc<F>,
    descriptor: Descriptor,
    target: ResolvedArg,
    config: OpenConfig,
    opener: Rc<dyn Opener>,
}

impl<F: Described> Wrapper<F> {
    /// Wraps `original`, opening files through `std::fs`.
    ///
    /// # Errors
    ///
    /// Fails when `filearg` does not name a declared parameter; see
    /// [`crate::Signature::resolve`].
    ///
    /// # Examples
    ///
    /// ```
    /// use fnfn::{Arguments, CallError, Function, OpenConfig, Signature, Wrapper};
    ///
    /// let count = Function::new("count", Signature::new().positional("file"), |_args: Arguments| {
    ///     Ok::<_, CallError>(0_usize)
    /// });
    /// let wrapper = Wrapper::new(count, 0, OpenConfig::default())?;
    /// assert_eq!(wrapper.filearg(), "file");
    /// assert_eq!(wrapper.position(), Some(0));
    /// # Ok::<(), fnfn::WrapError>(())
    /// ```
    pub fn new(original: F, filearg: impl Into<FileArg>, config: OpenConfig) -> WrapResult<Self> {
        Self::with_opener(original, filearg, config, Rc::new(FsOpener))
    }

    /// Wraps `original`, opening files through `opener`.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::new`].
    pub fn with_opener(
        original: F,
        filearg: impl Into<FileArg>,
        config: OpenConfig,
        opener: Rc<dyn Opener>,
    ) -> WrapResult<Self> {
        let target = original
            .signature()
            .resolve(&filearg.into(), original.name())?;
        debug!(
            "wrapping `{}` to open files passed as `{}`",
            original.name(),
            target.name()
        );
        Ok(Self {
            descriptor: original.descriptor().clone(),
            original: Rc::new(original),
            target,
            config,
            opener,
        })
    }
}

impl<F> Wrapper<F> {
    /// The wrapped callable.
    #[must_use]
    pub fn original(&self) -> &F {
        &self.original
    }

    /// Name of the file parameter.
    #[must_use]
    pub fn filearg(&self) -> &str {
        self.target.name()
    }

    /// Position of the file parameter, `None` when keyword-only.
    #[must_use]
    pub const fn position(&self) -> Option<usize> {
        self.target.position()
    }

    /// Options used for files this wrapper opens.
    #[must_use]
    pub const fn open_config(&self) -> &OpenConfig {
        &self.config
    }

    /// Binds a wrapped method to `instance`.
    ///
    /// The bound wrapper reuses the resolved file argument and options; this
    /// wrapper is left untouched.
    #[must_use]
    pub fn bind<S>(&self, instance: &Rc<S>) -> Wrapper<F::Bound>
    where
        F: Bindable<S>,
    {
        self.bind_to(instance)
    }

    fn bind_to<S>(&self, instance: &Rc<S>) -> Wrapper<F::Bound>
    where
        F: Bindable<S>,
    {
        let bound = self.original.bind(instance);
        Wrapper {
            descriptor: bound.descriptor().clone(),
            original: Rc::new(bound),
            target: self.target.clone(),
            config: self.config.clone(),
            opener: Rc::clone(&self.opener),
        }
    }

    fn locate(&self, args: &Arguments) -> Option<Slot> {
        let supplied = args.positional().len();
        if let Some(index) = self.target.position().filter(|&index| index < supplied) {
            return Some(Slot::Positional(index));
        }
        let name = self.target.name();
        args.keywords()
            .contains_key(name)
            .then(|| Slot::Keyword(name.to_owned()))
    }
}

impl<F> Wrapper<F>
where
    F: Callable + 'static,
    F::Item: 'static,
    F::Error: From<CallError> + 'static,
{
    fn open_around(
        &self,
        mut args: Arguments,
        slot: &Slot,
        name: &FileName,
    ) -> Result<Output<F::Item, F::Error>, F::Error> {
        let file = OpenedFile::acquire(self.opener.as_ref(), name, &self.config)?;
        if let Some(handle) = file.handle() {
            slot.replace(&mut args, Value::File(handle));
        }
        let output = self.original.call(args)?;
        file.release()?;
        Ok(output)
    }

    fn open_lazily(&self, mut args: Arguments, slot: Slot, name: FileName) -> Sequence<F::Item, F::Error> {
        let original = Rc::clone(&self.original);
        let opener = Rc::clone(&self.opener);
        let config = self.config.clone();
        Sequence::starting(move || {
            let file = OpenedFile::acquire(opener.as_ref(), &name, &config)?;
            if let Some(handle) = file.handle() {
                slot.replace(&mut args, Value::File(handle));
            }
            let items: Box<dyn Iterator<Item = Result<F::Item, F::Error>>> = match original.call(args)? {
                Output::Sequence(sequence) => Box::new(sequence),
                Output::Value(value) => Box::new(iter::once(Ok(value))),
            };
            Ok(Running::new(items, Some(file)))
        })
    }
}

impl<F> Described for Wrapper<F> {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl<F> Callable for Wrapper<F>
where
    F: Callable + 'static,
    F::Item: 'static,
    F::Error: From<CallError> + 'static,
{
    type Item = F::Item;
    type Error = F::Error;

    fn call(&self, args: Arguments) -> Result<Output<F::Item, F::Error>, F::Error> {
        let Some(slot) = self.locate(&args) else {
            trace!("`{}` called without `{}`", self.name(), self.filearg());
            return self.original.call(args);
        };

        let classification = slot
            .value(&args)
            .map_or(Classification::Invalid, classify);
        match classification {
            Classification::AlreadyOpen => self.original.call(args),
            Classification::NeedsOpening(name) if self.is_generator() => {
                Ok(Output::Sequence(self.open_lazily(args, slot, name)))
            }
            Classification::NeedsOpening(name) => self.open_around(args, &slot, &name),
            Classification::Invalid => Err(CallError::InvalidFileArgument {
                argument: self.filearg().to_owned(),
            }
            .into()),
        }
    }
}

impl<S, F> Bindable<S> for Wrapper<F>
where
    F: Bindable<S>,
{
    type Bound = Wrapper<F::Bound>;

    fn bind(&self, instance: &Rc<S>) -> Self::Bound {
        self.bind_to(instance)
    }
}

impl<F> Clone for Wrapper<F> {
    fn clone(&self) -> Self {
        Self {
            original: Rc::clone(&self.original),
            descriptor: self.descriptor.clone(),
            target: self.target.clone(),
            config: self.config.clone(),
            opener: Rc::clone(&self.opener),
        }
    }
}

impl<F> fmt::Debug for Wrapper<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapper")
            .field("name", &self.descriptor.name())
            .field("filearg", &self.target)
            .field("generator", &self.descriptor.is_generator())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
