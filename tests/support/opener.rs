//! In-memory [`Opener`] that records the handles it hands out.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, Cursor};

use fnfn::{FileHandle, FileName, OpenConfig, Opener};

/// In-memory files keyed by name.
#[derive(Default)]
pub struct MemoryOpener {
    files: BTreeMap<String, Vec<u8>>,
    opened: RefCell<Vec<FileHandle>>,
}

impl MemoryOpener {
    /// Adds a file.
    #[must_use]
    pub fn with_file(mut self, name: &str, contents: &str) -> Self {
        self.files.insert(name.to_owned(), contents.as_bytes().to_vec());
        self
    }

    /// Number of successful opens of `name`.
    pub fn opens_of(&self, name: &str) -> usize {
        self.opened
            .borrow()
            .iter()
            .filter(|handle| handle.name() == name)
            .count()
    }

    /// Number of successful opens.
    pub fn opens(&self) -> usize {
        self.opened.borrow().len()
    }

    /// Whether every handed-out handle has been closed.
    pub fn all_closed(&self) -> bool {
        self.opened.borrow().iter().all(FileHandle::is_closed)
    }

    /// Whether the most recent handle for `name` is still open.
    pub fn is_open(&self, name: &str) -> bool {
        self.opened
            .borrow()
            .iter()
            .rev()
            .find(|handle| handle.name() == name)
            .is_some_and(|handle| !handle.is_closed())
    }
}

impl Opener for MemoryOpener {
    fn open(&self, name: &FileName, config: &OpenConfig) -> io::Result<FileHandle> {
        let key = name.to_string();
        let contents = self
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no file `{key}`")))?;
        let handle = FileHandle::new(key, config.clone(), Cursor::new(contents));
        self.opened.borrow_mut().push(handle.clone());
        Ok(handle)
    }
}
