use std::io;
use std::io::prelude::*;

use crate::error::misuse;
use crate::framing::closing_padding;
use crate::layout::{BLOCK_SIZE, TERMINATOR_SIZE};
use crate::{HeaderDefaults, NewEntry};

/// A structure for building archives
///
/// This structure has methods for building up an archive from scratch into any
/// arbitrary writer. Entries are written one at a time: [`Builder::open`]
/// emits the header and lends out an [`EntryWriter`] for the payload, which
/// must be finished (or dropped) before the next entry is opened.
///
/// Dropping the builder finishes the archive, ignoring any error. Use
/// [`Builder::finish`] or [`Builder::into_inner`] to observe it.
pub struct Builder<W: Write> {
    defaults: HeaderDefaults,
    open: bool,
    finished: bool,
    obj: Option<W>,
}

/// The payload sink of an entry opened with [`Builder::open`].
///
/// Exactly the number of bytes declared by the entry's size must be written.
/// Finishing the writer pads the payload to a block boundary; dropping it
/// does the same but swallows any error.
pub struct EntryWriter<'a, W: Write> {
    builder: &'a mut Builder<W>,
    path: String,
    declared: u64,
    written: u64,
    closed: bool,
}

impl<W: Write> Builder<W> {
    /// Create a new archive builder with the underlying object as the
    /// destination of all data written. Fields left unset by each entry take
    /// the values of [`HeaderDefaults::default`].
    pub fn new(obj: W) -> Builder<W> {
        Builder::with_defaults(obj, HeaderDefaults::default())
    }

    /// Create a new archive builder filling unset header fields from
    /// `defaults`.
    pub fn with_defaults(obj: W, defaults: HeaderDefaults) -> Builder<W> {
        Builder {
            defaults,
            open: false,
            finished: false,
            obj: Some(obj),
        }
    }

    /// Returns the defaults applied to new entries.
    pub fn defaults(&self) -> &HeaderDefaults {
        &self.defaults
    }

    fn inner(&mut self) -> io::Result<&mut W> {
        self.obj
            .as_mut()
            .ok_or_else(|| misuse("archive has already been unwrapped"))
    }

    /// Unwrap this archive, returning the underlying object.
    ///
    /// This function will finish writing the archive if the `finish` function
    /// hasn't yet been called, returning any I/O error which happens during
    /// that operation.
    pub fn into_inner(mut self) -> io::Result<W> {
        if !self.finished {
            self.finish()?;
        }
        self.obj
            .take()
            .ok_or_else(|| misuse("archive has already been unwrapped"))
    }

    /// Writes the header of a new entry and returns the sink for its payload.
    ///
    /// Fields of `entry` that aren't set are filled from the builder's
    /// defaults, and the modification time defaults to now.
    ///
    /// # Errors
    ///
    /// Fails with `Misuse` if the previous entry's writer was never finished
    /// or dropped, or if the archive has been finished. Fails with
    /// `InvalidField` if `entry` has no size or a value doesn't fit its
    /// header field, and with `NameTooLong` if the path can't be stored.
    /// Nothing is written when the header can't be encoded, so the archive
    /// stays usable.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::prelude::*;
    /// use ustar::{Builder, NewEntry};
    ///
    /// let mut ar = Builder::new(Vec::new());
    /// let mut w = ar.open(NewEntry::new("foo/bar.txt").size(5).mode(0o600)).unwrap();
    /// w.write_all(b"hello").unwrap();
    /// w.finish().unwrap();
    /// let data = ar.into_inner().unwrap();
    /// assert_eq!(data.len(), 512 + 512 + 1024);
    /// ```
    pub fn open(&mut self, entry: NewEntry) -> io::Result<EntryWriter<W>> {
        if self.finished {
            return Err(misuse("cannot open an entry in a finished archive"));
        }
        if self.open {
            return Err(misuse(
                "previous entry must be finished before opening the next one",
            ));
        }

        let header = self.defaults.apply(entry)?;
        let block = header.to_block()?;
        self.inner()?.write_all(&block)?;
        tracing::trace!(path = header.path(), size = header.size(), "wrote entry header");

        self.open = true;
        Ok(EntryWriter {
            builder: self,
            declared: header.size(),
            path: header.path().to_string(),
            written: 0,
            closed: false,
        })
    }

    /// Adds an entry whose payload is `data`, setting its size accordingly.
    ///
    /// # Examples
    ///
    /// ```
    /// use ustar::{Builder, NewEntry};
    ///
    /// let mut ar = Builder::new(Vec::new());
    /// ar.append_data(NewEntry::new("really/long/path/to/foo"), &[1, 2, 3, 4]).unwrap();
    /// let data = ar.into_inner().unwrap();
    /// ```
    pub fn append_data(&mut self, entry: NewEntry, data: &[u8]) -> io::Result<()> {
        let mut w = self.open(entry.size(data.len() as u64))?;
        w.write_all(data)?;
        w.finish()
    }

    /// Adds an entry whose payload is the UTF-8 text `data`.
    pub fn append_str(&mut self, entry: NewEntry, data: &str) -> io::Result<()> {
        self.append_data(entry, data.as_bytes())
    }

    /// Adds an entry whose payload is copied from `data` until it is
    /// exhausted, returning the number of bytes copied.
    ///
    /// The size of `entry` must be set and must match what `data` yields.
    pub fn append_reader<R: Read>(&mut self, entry: NewEntry, mut data: R) -> io::Result<u64> {
        let mut w = self.open(entry)?;
        let n = io::copy(&mut data, &mut w)?;
        w.finish()?;
        Ok(n)
    }

    /// Finish writing this archive, emitting the termination sections.
    ///
    /// This function should only be called when the archive has been written
    /// entirely and if an I/O error happens the underlying object still needs
    /// to be acquired. Calling it again does nothing.
    ///
    /// In most situations the `into_inner` method should be preferred.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.open {
            return Err(misuse("cannot finish an archive with an entry still open"));
        }
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        tracing::debug!("writing end-of-archive marker");
        self.inner()?.write_all(&[0; TERMINATOR_SIZE])
    }
}

impl<W: Write> Drop for Builder<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

impl<'a, W: Write> EntryWriter<'a, W> {
    /// Returns how many payload bytes have been written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Closes the entry, writing the padding that completes its last block.
    ///
    /// A byte count that disagrees with the declared size is logged; the
    /// archive is left as written.
    pub fn finish(mut self) -> io::Result<()> {
        self.close()
    }

    fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.builder.open = false;
        let pad = closing_padding(&self.path, self.declared, self.written);
        self.builder.inner()?.write_all(&[0; BLOCK_SIZE][..pad])
    }
}

impl<'a, W: Write> Write for EntryWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.builder.inner()?.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.builder.inner()?.flush()
    }
}

impl<'a, W: Write> Drop for EntryWriter<'a, W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
