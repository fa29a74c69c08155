//! Wrappers that let file-taking functions accept filenames too.
//!
//! Callables are declared with an explicit [`Signature`] so a [`Wrapper`] can
//! find the parameter that expects an open file. When a call passes a
//! filename there, the wrapper opens it with the configured options, hands the
//! [`FileHandle`] to the original, and closes it afterwards. Open handles pass
//! straight through. Generator-like callables keep the file open until the
//! returned [`Sequence`] finishes.
//!
//! ```
//! use fnfn::{Arguments, CallError, Function, Signature, wrap};
//!
//! fn count_lines(args: Arguments) -> Result<usize, CallError> {
//!     let file = args.file(0, "file").ok_or(CallError::InvalidFileArgument {
//!         argument: "file".to_owned(),
//!     })?;
//!     let text = file.read_text().map_err(|source| CallError::Open {
//!         name: file.name().to_owned(),
//!         source,
//!     })?;
//!     Ok(text.lines().count())
//! }
//!
//! let counter = wrap(Function::new(
//!     "count_lines",
//!     Signature::new().positional("file"),
//!     count_lines,
//! ))?;
//! assert_eq!(counter.filearg(), "file");
//! # Ok::<(), fnfn::WrapError>(())
//! ```

pub mod decorator;
pub mod error;
pub mod function;
pub mod handle;
pub mod options;
pub mod sequence;
pub mod signature;
pub mod value;
pub mod wrapper;

pub use decorator::{Decorator, DecoratorConfig, wrap};
pub use error::{CallError, ErrorKind, WrapError, WrapResult};
pub use function::{
    Arguments, Bindable, Callable, Described, Descriptor, Function, Method, Output,
};
pub use handle::{FileHandle, FsOpener, Opener, Stream};
pub use options::{
    Access, Encoding, ErrorPolicy, Mode, Newline, OPEN_OPTIONS, OpenConfig, OptionValue,
    RESERVED_OPTION,
};
pub use sequence::Sequence;
pub use signature::{FileArg, Parameter, ParameterKind, ResolvedArg, Signature};
pub use value::{Classification, FileName, Value, classify, is_valid_filename};
pub use wrapper::Wrapper;
