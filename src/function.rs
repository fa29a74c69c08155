//! Callables described by explicit signatures.
//!
//! [`Function`] and [`Method`] pair a body with a [`Descriptor`] declaring its
//! name, documentation, parameters and whether it produces a lazy
//! [`Sequence`]. Wrappers only ever see callables through the [`Described`],
//! [`Callable`] and [`Bindable`] traits, so wrappers stack over each other.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::handle::FileHandle;
use crate::sequence::Sequence;
use crate::signature::Signature;
use crate::value::Value;

/// Arguments supplied to a single call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    keywords: BTreeMap<String, Value>,
}

impl Arguments {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Positional arguments in order.
    #[must_use]
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments by name.
    #[must_use]
    pub const fn keywords(&self) -> &BTreeMap<String, Value> {
        &self.keywords
    }

    /// Positional argument at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument called `name`.
    #[must_use]
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords.get(name)
    }

    /// Looks up a parameter that may arrive by position or by keyword.
    ///
    /// # Examples
    ///
    /// ```
    /// use fnfn::{Arguments, Value};
    ///
    /// let by_keyword = Arguments::new().kwarg("src", "a.txt");
    /// assert_eq!(by_keyword.param(0, "src"), Some(&Value::from("a.txt")));
    /// ```
    #[must_use]
    pub fn param(&self, index: usize, name: &str) -> Option<&Value> {
        self.get(index).or_else(|| self.keyword(name))
    }

    /// The open file passed for a parameter, if any.
    #[must_use]
    pub fn file(&self, index: usize, name: &str) -> Option<&FileHandle> {
        self.param(index, name).and_then(Value::as_file)
    }

    pub(crate) fn positional_mut(&mut self) -> &mut Vec<Value> {
        &mut self.positional
    }

    pub(crate) fn keywords_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.keywords
    }
}

/// Result of calling a callable: a value, or a lazy sequence for
/// generator-like callables.
pub enum Output<T, E> {
    /// Eagerly computed value.
    Value(T),
    /// Lazily produced items.
    Sequence(Sequence<T, E>),
}

impl<T, E> Output<T, E> {
    /// The eager value, if this is one.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Sequence(_) => None,
        }
    }

    /// The lazy sequence, if this is one.
    #[must_use]
    pub fn into_sequence(self) -> Option<Sequence<T, E>> {
        match self {
            Self::Sequence(sequence) => Some(sequence),
            Self::Value(_) => None,
        }
    }

    /// Whether this is a lazy sequence.
    #[must_use]
    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Output<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Sequence(sequence) => f.debug_tuple("Sequence").field(sequence).finish(),
        }
    }
}

/// Introspectable surface of a callable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    doc: Option<String>,
    signature: Signature,
    generator: bool,
}

impl Descriptor {
    fn new(name: impl Into<String>, signature: Signature, generator: bool) -> Self {
        Self {
            name: name.into(),
            doc: None,
            signature,
            generator,
        }
    }

    /// Callable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation, if any.
    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Declared parameters.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether calling produces a lazy sequence.
    #[must_use]
    pub const fn is_generator(&self) -> bool {
        self.generator
    }
}

/// A callable with an introspectable [`Descriptor`].
pub trait Described {
    /// Returns the callable's descriptor.
    fn descriptor(&self) -> &Descriptor;

    /// Callable name.
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Declared parameters.
    fn signature(&self) -> &Signature {
        self.descriptor().signature()
    }

    /// Whether calling produces a lazy sequence.
    fn is_generator(&self) -> bool {
        self.descriptor().is_generator()
    }
}

/// A described callable that can be invoked.
pub trait Callable: Described {
    /// Value type produced by the callable.
    type Item;
    /// Error type raised by the callable.
    type Error;

    /// Invokes the callable.
    ///
    /// # Errors
    ///
    /// Returns whatever error the callable raises.
    fn call(&self, args: Arguments) -> Result<Output<Self::Item, Self::Error>, Self::Error>;
}

/// A described callable that must be bound to an instance before use.
pub trait Bindable<S>: Described {
    /// The instance-bound callable.
    type Bound: Described;

    /// Binds the callable to `instance`.
    fn bind(&self, instance: &Rc<S>) -> Self::Bound;
}

type Body<T, E> = Rc<dyn Fn(Arguments) -> Result<Output<T, E>, E>>;

/// A free-standing callable.
///
/// # Examples
///
/// ```
/// use fnfn::{Arguments, CallError, Callable, Function, Signature, Value};
///
/// let double = Function::new("double", Signature::new().positional("n"), |args: Arguments| {
///     Ok::<_, CallError>(args.get(0).and_then(Value::as_int).unwrap_or_default() * 2)
/// });
/// let output = double.call(Arguments::new().arg(21_i64))?;
/// assert_eq!(output.into_value(), Some(42));
/// # Ok::<(), CallError>(())
/// ```
pub struct Function<T, E> {
    descriptor: Descriptor,
    body: Body<T, E>,
}

impl<T: 'static, E: 'static> Function<T, E> {
    /// Declares an eager function.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> Result<T, E> + 'static,
    {
        Self {
            descriptor: Descriptor::new(name, signature, false),
            body: Rc::new(move |args: Arguments| body(args).map(Output::Value)),
        }
    }

    /// Declares a generator-like function whose body runs on the first poll
    /// of the returned [`Sequence`].
    #[must_use]
    pub fn generator<F, I>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Arguments) -> I + 'static,
        I: IntoIterator<Item = Result<T, E>> + 'static,
        I::IntoIter: 'static,
    {
        let shared = Rc::new(body);
        Self {
            descriptor: Descriptor::new(name, signature, true),
            body: Rc::new(move |args: Arguments| {
                let produce = Rc::clone(&shared);
                Ok(Output::Sequence(Sequence::deferred(move || produce(args))))
            }),
        }
    }
}

impl<T, E> Function<T, E> {
    /// Attaches documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.descriptor.doc = Some(doc.into());
        self
    }
}

impl<T, E> Clone for Function<T, E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            body: Rc::clone(&self.body),
        }
    }
}

impl<T, E> fmt::Debug for Function<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl<T, E> Described for Function<T, E> {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl<T, E> Callable for Function<T, E> {
    type Item = T;
    type Error = E;

    fn call(&self, args: Arguments) -> Result<Output<T, E>, E> {
        (self.body)(args)
    }
}

type MethodBody<S, T, E> = Rc<dyn Fn(&Rc<S>, Arguments) -> Result<Output<T, E>, E>>;

/// A callable that receives an instance of `S` in addition to its arguments.
///
/// The receiver is not part of the [`Signature`]: index `0` names the first
/// parameter after it.
pub struct Method<S, T, E> {
    descriptor: Descriptor,
    body: MethodBody<S, T, E>,
}

impl<S: 'static, T: 'static, E: 'static> Method<S, T, E> {
    /// Declares an eager method.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(&S, Arguments) -> Result<T, E> + 'static,
    {
        Self {
            descriptor: Descriptor::new(name, signature, false),
            body: Rc::new(move |instance: &Rc<S>, args: Arguments| {
                body(&**instance, args).map(Output::Value)
            }),
        }
    }

    /// Declares a generator-like method. The body receives a shared handle on
    /// the instance because it runs after the call returns.
    #[must_use]
    pub fn generator<F, I>(name: impl Into<String>, signature: Signature, body: F) -> Self
    where
        F: Fn(Rc<S>, Arguments) -> I + 'static,
        I: IntoIterator<Item = Result<T, E>> + 'static,
        I::IntoIter: 'static,
    {
        let shared = Rc::new(body);
        Self {
            descriptor: Descriptor::new(name, signature, true),
            body: Rc::new(move |instance: &Rc<S>, args: Arguments| {
                let produce = Rc::clone(&shared);
                let receiver = Rc::clone(instance);
                Ok(Output::Sequence(Sequence::deferred(move || produce(receiver, args))))
            }),
        }
    }
}

impl<S, T, E> Method<S, T, E> {
    /// Attaches documentation.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.descriptor.doc = Some(doc.into());
        self
    }
}

impl<S, T, E> Clone for Method<S, T, E> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            body: Rc::clone(&self.body),
        }
    }
}

impl<S, T, E> fmt::Debug for Method<S, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl<S, T, E> Described for Method<S, T, E> {
    fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl<S: 'static, T: 'static, E: 'static> Bindable<S> for Method<S, T, E> {
    type Bound = Function<T, E>;

    fn bind(&self, instance: &Rc<S>) -> Function<T, E> {
        let body = Rc::clone(&self.body);
        let receiver = Rc::clone(instance);
        Function {
            descriptor: self.descriptor.clone(),
            body: Rc::new(move |args: Arguments| body(&receiver, args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallError;
    use rstest::rstest;
    use std::cell::Cell;

    #[rstest]
    fn param_prefers_the_position() {
        let args = Arguments::new().arg("first").kwarg("src", "second");

        assert_eq!(args.param(0, "src"), Some(&Value::from("first")));
        assert_eq!(args.param(1, "src"), Some(&Value::from("second")));
        assert_eq!(args.param(1, "dst"), None);
    }

    #[rstest]
    fn generator_bodies_wait_for_the_first_poll() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let count_up = Function::generator("count_up", Signature::new(), move |_| {
            counter.set(counter.get() + 1);
            (1..=3_i64).map(Ok::<_, CallError>)
        });

        let sequence = count_up
            .call(Arguments::new())
            .expect("call succeeds")
            .into_sequence()
            .expect("generators return sequences");

        assert!(count_up.is_generator());
        assert_eq!(calls.get(), 0);
        let items: Result<Vec<_>, _> = sequence.collect();
        assert_eq!(items.expect("no errors"), vec![1, 2, 3]);
        assert_eq!(calls.get(), 1);
    }

    #[rstest]
    fn bound_methods_see_their_instance() {
        struct Counter {
            step: i64,
        }

        let advance = Method::new(
            "advance",
            Signature::new().positional("from"),
            |this: &Counter, args: Arguments| {
                Ok::<_, CallError>(args.get(0).and_then(Value::as_int).unwrap_or_default() + this.step)
            },
        )
        .with_doc("Adds the instance step.");

        let bound = advance.bind(&Rc::new(Counter { step: 3 }));
        let output = bound.call(Arguments::new().arg(4_i64)).expect("call succeeds");

        assert_eq!(output.into_value(), Some(7));
        assert_eq!(bound.name(), "advance");
        assert_eq!(bound.descriptor().doc(), Some("Adds the instance step."));
    }
}
