//! Lazily started sequences that may hold an opened file.
//!
//! A [`Sequence`] does nothing until first polled. When a wrapper opens a
//! file for a lazy callable, the file belongs to the running sequence and is
//! released when the sequence is exhausted, yields an error, is closed, or
//! is dropped, whichever happens first.

use std::fmt;
use std::mem;

use crate::error::CallError;
use crate::handle::OpenedFile;

type Items<T, E> = Box<dyn Iterator<Item = Result<T, E>>>;
type Start<T, E> = Box<dyn FnOnce() -> Result<Running<T, E>, E>>;

pub(crate) struct Running<T, E> {
    items: Items<T, E>,
    file: Option<OpenedFile>,
}

impl<T, E> Running<T, E> {
    pub(crate) fn new(items: Items<T, E>, file: Option<OpenedFile>) -> Self {
        Self { items, file }
    }

    /// Stops the inner items first, then releases the file.
    fn finish(self) -> Result<(), CallError> {
        let Self { items, file } = self;
        drop(items);
        file.map_or(Ok(()), OpenedFile::release)
    }
}

enum State<T, E> {
    Pending(Start<T, E>),
    Running(Running<T, E>),
    Finished,
}

/// A lazy, resumable sequence of fallible items.
///
/// # Examples
///
/// ```
/// use fnfn::{CallError, Sequence};
///
/// let mut numbers = Sequence::<i64, CallError>::new(vec![Ok(1), Ok(2)]);
/// assert_eq!(numbers.next().transpose()?, Some(1));
/// numbers.close()?;
/// assert!(numbers.next().is_none());
/// # Ok::<(), CallError>(())
/// ```
pub struct Sequence<T, E> {
    state: State<T, E>,
}

impl<T: 'static, E: 'static> Sequence<T, E> {
    /// Wraps ready-made items.
    #[must_use]
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: 'static,
    {
        Self {
            state: State::Running(Running::new(Box::new(items.into_iter()), None)),
        }
    }

    /// Defers producing the items until the first poll.
    #[must_use]
    pub fn deferred<F, I>(produce: F) -> Self
    where
        F: FnOnce() -> I + 'static,
        I: IntoIterator<Item = Result<T, E>>,
        I::IntoIter: 'static,
    {
        Self::starting(move || {
            let items: Items<T, E> = Box::new(produce().into_iter());
            Ok(Running::new(items, None))
        })
    }

    #[must_use]
    pub(crate) fn starting<F>(start: F) -> Self
    where
        F: FnOnce() -> Result<Running<T, E>, E> + 'static,
    {
        Self {
            state: State::Pending(Box::new(start)),
        }
    }
}

impl<T, E> Sequence<T, E> {
    /// Whether the sequence has not produced anything yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending(_))
    }

    /// Whether the sequence has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.state, State::Finished)
    }
}

impl<T, E> Sequence<T, E>
where
    E: From<CallError>,
{
    /// Ends the sequence early, releasing any file it holds.
    ///
    /// # Errors
    ///
    /// Returns the error raised while closing the file.
    pub fn close(&mut self) -> Result<(), E> {
        match mem::replace(&mut self.state, State::Finished) {
            State::Running(running) => running.finish().map_err(E::from),
            State::Pending(_) | State::Finished => Ok(()),
        }
    }
}

impl<T, E> Iterator for Sequence<T, E>
where
    E: From<CallError>,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut running = match mem::replace(&mut self.state, State::Finished) {
            State::Finished => return None,
            State::Running(running) => running,
            State::Pending(start) => match start() {
                Ok(running) => running,
                Err(error) => return Some(Err(error)),
            },
        };

        match running.items.next() {
            Some(Ok(item)) => {
                self.state = State::Running(running);
                Some(Ok(item))
            }
            Some(Err(error)) => {
                // The item error wins over any failure to close.
                drop(running);
                Some(Err(error))
            }
            None => running.finish().err().map(|error| Err(E::from(error))),
        }
    }
}

impl<T, E> fmt::Debug for Sequence<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Pending(_) => "pending",
            State::Running(running) if running.file.is_some() => "running (holding file)",
            State::Running(_) => "running",
            State::Finished => "finished",
        };
        f.debug_struct("Sequence").field("state", &state).finish()
    }
}
