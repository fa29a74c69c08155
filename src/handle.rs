//! Open file handles and the collaborator that creates them.
//!
//! [`FileHandle`] is a shared, closable stream. Wrappers pass a clone to the
//! original function and close it themselves once the call (or sequence)
//! ends, so the handle is released even if the function kept a copy.
//! [`Opener`] is the seam to the platform's file-open primitive;
//! [`FsOpener`] is the production implementation over `std::fs`.

use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::rc::Rc;

use log::{debug, warn};

use crate::error::CallError;
use crate::options::{Access, Encoding, ErrorPolicy, Mode, Newline, OpenConfig};
use crate::value::FileName;

/// Byte stream backing a [`FileHandle`].
pub trait Stream: Read + Write {}

impl<T: Read + Write> Stream for T {}

struct HandleState {
    name: String,
    config: OpenConfig,
    stream: RefCell<Option<OpenStream>>,
}

/// An open stream plus one byte of lookahead left over from line reading.
struct OpenStream {
    inner: Box<dyn Stream>,
    pending: Option<u8>,
}

impl OpenStream {
    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0_u8; 1];
        let read = self.read(&mut byte)?;
        let [value] = byte;
        Ok((read == 1).then_some(value))
    }

    const fn unread(&mut self, byte: u8) {
        self.pending = Some(byte);
    }
}

impl Read for OpenStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match (self.pending.take(), buf.first_mut()) {
            (Some(byte), Some(slot)) => {
                *slot = byte;
                Ok(1)
            }
            (pending, _) => {
                self.pending = pending;
                self.inner.read(buf)
            }
        }
    }
}

impl Write for OpenStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A shared handle to an open stream.
///
/// Clones refer to the same stream. Closing any clone closes all of them;
/// afterwards every read or write fails.
#[derive(Clone)]
pub struct FileHandle {
    state: Rc<HandleState>,
}

impl FileHandle {
    /// Wraps an already open stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use fnfn::{FileHandle, OpenConfig};
    ///
    /// let handle = FileHandle::new("memory", OpenConfig::default(), Cursor::new(b"hi".to_vec()));
    /// let mut text = String::new();
    /// (&handle).read_to_string(&mut text)?;
    /// assert_eq!(text, "hi");
    /// # Ok::<(), std::io::Error>(())
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, config: OpenConfig, stream: impl Stream + 'static) -> Self {
        Self {
            state: Rc::new(HandleState {
                name: name.into(),
                config,
                stream: RefCell::new(Some(OpenStream {
                    inner: Box::new(stream),
                    pending: None,
                })),
            }),
        }
    }

    /// Name the handle was opened with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Mode the handle was opened with.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.config.mode()
    }

    /// Options the handle was opened with.
    #[must_use]
    pub fn config(&self) -> &OpenConfig {
        &self.state.config
    }

    /// Whether the handle has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.stream.borrow().is_none()
    }

    /// Whether `other` refers to the same underlying stream.
    #[must_use]
    pub fn same_file(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Flushes and closes the stream. Closing a closed handle does nothing.
    ///
    /// # Errors
    ///
    /// Returns the flush error, if any. The handle is closed either way.
    pub fn close(&self) -> io::Result<()> {
        let taken = self.state.stream.borrow_mut().take();
        match taken {
            Some(mut stream) => stream.inner.flush(),
            None => Ok(()),
        }
    }

    fn with_stream<R>(&self, operation: impl FnOnce(&mut OpenStream) -> io::Result<R>) -> io::Result<R> {
        let mut guard = self.state.stream.borrow_mut();
        match guard.as_mut() {
            Some(stream) => operation(stream),
            None => Err(io::Error::other(format!(
                "I/O operation on closed file `{}`",
                self.state.name
            ))),
        }
    }

    fn require_text(&self) -> io::Result<()> {
        if self.mode().is_binary() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{}` was opened in binary mode", self.state.name),
            ));
        }
        Ok(())
    }

    /// Reads the rest of the stream as text, honouring the configured
    /// encoding, error policy and newline translation.
    ///
    /// # Errors
    ///
    /// Fails when the handle is binary or closed, on I/O errors, and on
    /// undecodable input under the strict policy.
    pub fn read_text(&self) -> io::Result<String> {
        self.require_text()?;
        let mut bytes = Vec::new();
        self.with_stream(|stream| stream.read_to_end(&mut bytes))?;
        let text = decode(&bytes, self.config().encoding(), self.config().errors())?;
        Ok(translate_newlines(text, self.config().newline()))
    }

    /// Reads one line of text, including its terminator, or `None` at end of
    /// file.
    ///
    /// Universal and untranslated handles end a line at `\n`, `\r\n` or a
    /// lone `\r`; the other newline settings end it only at their own
    /// terminator.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::read_text`].
    pub fn read_line(&self) -> io::Result<Option<String>> {
        self.require_text()?;
        let newline = self.config().newline();
        let mut bytes = Vec::new();
        self.with_stream(|stream| {
            while let Some(byte) = stream.next_byte()? {
                bytes.push(byte);
                let line_ended = match (byte, newline) {
                    (b'\r', Newline::Universal | Newline::Untranslated) => {
                        match stream.next_byte()? {
                            Some(b'\n') => bytes.push(b'\n'),
                            Some(other) => stream.unread(other),
                            None => {}
                        }
                        true
                    }
                    (b'\n', Newline::CrLf) => bytes.ends_with(b"\r\n"),
                    (b'\n', Newline::Universal | Newline::Untranslated | Newline::Lf)
                    | (b'\r', Newline::Cr) => true,
                    _ => false,
                };
                if line_ended {
                    break;
                }
            }
            Ok(())
        })?;
        if bytes.is_empty() {
            return Ok(None);
        }
        let text = decode(&bytes, self.config().encoding(), self.config().errors())?;
        Ok(Some(translate_newlines(text, self.config().newline())))
    }

    /// Writes text, encoding it and translating `\n` per the newline option.
    ///
    /// # Errors
    ///
    /// Fails when the handle is binary or closed, on I/O errors, and on
    /// unencodable text under the strict policy.
    pub fn write_text(&self, text: &str) -> io::Result<()> {
        self.require_text()?;
        let config = self.config();
        let translated = text.replace('\n', config.newline().write_terminator());
        let bytes = encode(&translated, config.encoding(), config.errors())?;
        self.with_stream(|stream| stream.write_all(&bytes))
    }
}

impl Read for &FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_stream(|stream| stream.read(buf))
    }
}

impl Write for &FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_stream(|stream| stream.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_stream(|stream| stream.flush())
    }
}

impl Read for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

impl Write for FileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        (&*self).flush()
    }
}

impl PartialEq for FileHandle {
    fn eq(&self, other: &Self) -> bool {
        self.same_file(other)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.state.name)
            .field("mode", &self.mode().to_string())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn decode(bytes: &[u8], encoding: Encoding, errors: ErrorPolicy) -> io::Result<String> {
    match encoding {
        Encoding::Utf8 => match (std::str::from_utf8(bytes), errors) {
            (Ok(text), _) => Ok(text.to_owned()),
            (Err(_), ErrorPolicy::Replace) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            (Err(_), ErrorPolicy::Ignore) => Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()),
            (Err(error), ErrorPolicy::Strict) => Err(io::Error::new(io::ErrorKind::InvalidData, error)),
        },
        Encoding::Ascii => bytes
            .iter()
            .filter_map(|&byte| match (byte.is_ascii(), errors) {
                (true, _) => Some(Ok(char::from(byte))),
                (false, ErrorPolicy::Replace) => Some(Ok('\u{FFFD}')),
                (false, ErrorPolicy::Ignore) => None,
                (false, ErrorPolicy::Strict) => Some(Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("byte 0x{byte:02x} is not ASCII"),
                ))),
            })
            .collect(),
        Encoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

fn encode(text: &str, encoding: Encoding, errors: ErrorPolicy) -> io::Result<Vec<u8>> {
    let limit = match encoding {
        Encoding::Utf8 => return Ok(text.as_bytes().to_vec()),
        Encoding::Ascii => 0x7f,
        Encoding::Latin1 => 0xff,
    };
    text.chars()
        .filter_map(|character| match (u8::try_from(u32::from(character)), errors) {
            (Ok(byte), _) if u32::from(byte) <= limit => Some(Ok(byte)),
            (_, ErrorPolicy::Replace) => Some(Ok(b'?')),
            (_, ErrorPolicy::Ignore) => None,
            (_, ErrorPolicy::Strict) => Some(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("character {character:?} cannot be encoded"),
            ))),
        })
        .collect()
}

fn translate_newlines(text: String, newline: Newline) -> String {
    match newline {
        Newline::Universal => text.replace("\r\n", "\n").replace('\r', "\n"),
        _ => text,
    }
}

/// Creates file handles on behalf of a wrapper.
#[cfg_attr(test, mockall::automock)]
pub trait Opener {
    /// Opens `name` with `config`.
    ///
    /// # Errors
    ///
    /// Returns the platform's I/O error when the file cannot be opened.
    fn open(&self, name: &FileName, config: &OpenConfig) -> io::Result<FileHandle>;
}

/// Opens files through `std::fs`.
///
/// # Examples
///
/// ```no_run
/// use fnfn::{FileName, FsOpener, OpenConfig, Opener};
///
/// let handle = FsOpener.open(&FileName::Text("notes.txt".to_owned()), &OpenConfig::default())?;
/// println!("{}", handle.read_text()?);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct FsOpener;

impl Opener for FsOpener {
    fn open(&self, name: &FileName, config: &OpenConfig) -> io::Result<FileHandle> {
        let mode = config.mode();
        let mut options = fs::OpenOptions::new();
        options.read(mode.readable());
        match mode.access() {
            Access::Read => options.write(mode.is_update()),
            Access::Write => options.write(true).create(true).truncate(true),
            Access::Append => options.append(true).create(true),
            Access::Exclusive => options.write(true).create_new(true),
        };

        let file = options.open(name.to_path())?;
        Ok(FileHandle::new(
            name.to_string(),
            config.clone(),
            Buffered::new(file, mode, config.buffering()),
        ))
    }
}

/// Applies the `buffering` option to a freshly opened file.
enum Buffered {
    Raw(fs::File),
    Reader(BufReader<fs::File>),
    Writer(BufWriter<fs::File>),
}

impl Buffered {
    fn new(file: fs::File, mode: Mode, buffering: i64) -> Self {
        if buffering == 0 || mode.is_update() {
            return Self::Raw(file);
        }
        let capacity = usize::try_from(buffering)
            .ok()
            .filter(|&size| size > 1)
            .unwrap_or(DEFAULT_BUFFER_SIZE);
        if mode.readable() {
            Self::Reader(BufReader::with_capacity(capacity, file))
        } else {
            Self::Writer(BufWriter::with_capacity(capacity, file))
        }
    }
}

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

impl Read for Buffered {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Raw(file) => file.read(buf),
            Self::Reader(reader) => reader.read(buf),
            Self::Writer(_) => Err(not_supported("read")),
        }
    }
}

impl Write for Buffered {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Raw(file) => file.write(buf),
            Self::Writer(writer) => writer.write(buf),
            Self::Reader(_) => Err(not_supported("write")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Raw(file) => file.flush(),
            Self::Writer(writer) => writer.flush(),
            Self::Reader(_) => Ok(()),
        }
    }
}

fn not_supported(operation: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("file not open for {operation}ing"),
    )
}

/// Scoped ownership of a file the wrapper opened itself.
///
/// The file is closed exactly once: by [`Self::release`] or, failing that,
/// on drop.
pub(crate) struct OpenedFile {
    handle: Option<FileHandle>,
}

impl OpenedFile {
    pub(crate) fn acquire(
        opener: &dyn Opener,
        name: &FileName,
        config: &OpenConfig,
    ) -> Result<Self, CallError> {
        let handle = opener
            .open(name, config)
            .map_err(|source| CallError::Open {
                name: name.to_string(),
                source,
            })?;
        debug!("opened `{name}` with mode `{}`", config.mode());
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Returns a clone of the managed handle, or `None` once released.
    pub(crate) fn handle(&self) -> Option<FileHandle> {
        self.handle.clone()
    }

    /// Closes the file, reporting flush failures.
    pub(crate) fn release(mut self) -> Result<(), CallError> {
        self.handle.take().map_or(Ok(()), close_handle)
    }
}

fn close_handle(handle: FileHandle) -> Result<(), CallError> {
    debug!("releasing `{}`", handle.name());
    handle.close().map_err(|source| CallError::Close {
        name: handle.name().to_owned(),
        source,
    })
}

impl Drop for OpenedFile {
    fn drop(&mut self) {
        if let Err(error) = self.handle.take().map_or(Ok(()), close_handle) {
            warn!("{error}");
        }
    }
}
