use std::cell::{Cell, RefCell};
use std::io;
use std::io::prelude::*;
use std::marker;

use crate::entry::{Entry, EntryFields};
use crate::error::{misuse, unexpected_eof};
use crate::framing::Framing;
use crate::layout::BLOCK_SIZE;
use crate::header::is_zero_block;
use crate::Header;

macro_rules! try_iter {
    ($me:expr, $e:expr) => {
        match $e {
            Ok(e) => e,
            Err(e) => {
                $me.done.set(true);
                return Some(Err(e));
            }
        }
    };
}

/// A top-level representation of an archive file.
///
/// The archive is read strictly front to back. Entries are handed out one at
/// a time and each must be dropped (or cancelled) before the next one is
/// requested.
pub struct Archive<R: ?Sized + Read> {
    inner: ArchiveInner<R>,
}

pub(crate) struct ArchiveInner<R: ?Sized> {
    pos: Cell<u64>,
    framing: Cell<Framing>,
    claimed: Cell<bool>,
    done: Cell<bool>,
    obj: RefCell<R>,
}

/// An iterator over the entries of an archive.
pub struct Entries<'a, R: 'a + Read> {
    fields: EntriesFields<'a>,
    _ignored: marker::PhantomData<&'a Archive<R>>,
}

struct EntriesFields<'a> {
    archive: &'a Archive<dyn Read + 'a>,
}

impl<R: Read> Archive<R> {
    /// Create a new archive with the underlying object as the reader.
    pub fn new(obj: R) -> Archive<R> {
        Archive {
            inner: ArchiveInner {
                pos: Cell::new(0),
                framing: Cell::new(Framing::default()),
                claimed: Cell::new(false),
                done: Cell::new(false),
                obj: RefCell::new(obj),
            },
        }
    }

    /// Unwrap this archive, returning the underlying object.
    ///
    /// Nothing past the last byte consumed is read, so the object is left
    /// positioned wherever iteration stopped. After a complete archive that
    /// is just past its end-of-archive marker.
    pub fn into_inner(self) -> R {
        self.inner.obj.into_inner()
    }

    /// Construct an iterator over the entries in this archive.
    ///
    /// Each entry borrows the archive. Asking the iterator for the next entry
    /// while the previous one is still alive yields a `Misuse` error; once it
    /// is dropped, whatever it left unread is skipped automatically.
    ///
    /// Iteration ends at the first block that doesn't carry the `ustar`
    /// magic (normally the end-of-archive marker) or when the underlying
    /// reader is exhausted on a block boundary.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::prelude::*;
    /// use ustar::{Archive, Builder, NewEntry};
    ///
    /// let mut ar = Builder::new(Vec::new());
    /// ar.append_str(NewEntry::new("hello.txt"), "hello").unwrap();
    /// let data = ar.into_inner().unwrap();
    ///
    /// let mut ar = Archive::new(&data[..]);
    /// for entry in ar.entries().unwrap() {
    ///     let mut entry = entry.unwrap();
    ///     let mut s = String::new();
    ///     entry.read_to_string(&mut s).unwrap();
    ///     assert_eq!(entry.path(), "hello.txt");
    ///     assert_eq!(s, "hello");
    /// }
    /// ```
    pub fn entries(&mut self) -> io::Result<Entries<R>> {
        let me: &mut Archive<dyn Read> = self;
        me._entries().map(|fields| Entries {
            fields,
            _ignored: marker::PhantomData,
        })
    }
}

impl<'a> Archive<dyn Read + 'a> {
    fn _entries(&mut self) -> io::Result<EntriesFields> {
        if self.inner.claimed.get() {
            return Err(misuse("an entry of this archive is still held"));
        }
        Ok(EntriesFields { archive: self })
    }
}

impl<R: ?Sized + Read> ArchiveInner<R> {
    /// Hands the consumer up to `into.len()` payload bytes of the current
    /// entry, or skips the rest of the entry and returns 0 once nothing is
    /// left to deliver.
    ///
    /// At most one read is issued against the underlying object. The read
    /// may run into the padding; those bytes land in `into` but aren't
    /// counted.
    pub(crate) fn pull(&self, into: &mut [u8]) -> io::Result<usize> {
        let mut framing = self.framing.get();
        if framing.is_draining() {
            self.drain()?;
            return Ok(0);
        }
        if into.is_empty() {
            return Ok(0);
        }

        let want = framing.request(into.len());
        let mut me = self;
        let n = me.read(&mut into[..want])?;
        if n == 0 {
            return Err(unexpected_eof(format!(
                "archive ended with {} bytes of entry data still to come",
                framing.remaining()
            )));
        }
        let payload = framing.consume(n);
        self.framing.set(framing);
        Ok(payload)
    }

    /// Reads and discards everything the current entry still owes, payload
    /// and padding alike.
    pub(crate) fn drain(&self) -> io::Result<()> {
        let mut framing = self.framing.get();
        if framing.owed() == 0 {
            self.framing.set(Framing::default());
            return Ok(());
        }
        tracing::trace!(offset = self.pos.get(), bytes = framing.owed(), "skipping rest of entry");

        let mut buf = [0u8; 4096 * 8];
        let mut me = self;
        while framing.owed() > 0 {
            let n = framing.request(buf.len());
            let n = me.read(&mut buf[..n])?;
            if n == 0 {
                return Err(unexpected_eof("unexpected EOF during skip"));
            }
            framing.consume(n);
            self.framing.set(framing);
        }
        self.framing.set(Framing::default());
        Ok(())
    }

    pub(crate) fn framing(&self) -> Framing {
        self.framing.get()
    }

    pub(crate) fn cancel(&self) -> io::Result<()> {
        let mut framing = self.framing.get();
        tracing::debug!(remaining = framing.remaining(), "cancelling entry");
        framing.cancel();
        self.framing.set(framing);
        self.drain()
    }

    pub(crate) fn release(&self) {
        self.claimed.set(false);
    }

    /// Fills `block` with the next header block.
    ///
    /// Returns `false` if the underlying object is exhausted before the
    /// first byte. Running out part way through the block is an error.
    fn read_block(&self, block: &mut [u8; BLOCK_SIZE]) -> io::Result<bool> {
        let mut read = 0;
        let mut me = self;
        while read < block.len() {
            match me.read(&mut block[read..])? {
                0 if read == 0 => return Ok(false),
                0 => {
                    return Err(unexpected_eof(format!(
                        "archive ended {} bytes into a header block",
                        read
                    )))
                }
                n => read += n,
            }
        }
        Ok(true)
    }
}

impl<'a, R: Read> Iterator for Entries<'a, R> {
    type Item = io::Result<Entry<'a, R>>;

    fn next(&mut self) -> Option<io::Result<Entry<'a, R>>> {
        self.fields
            .next()
            .map(|result| result.map(|fields| fields.into_entry()))
    }
}

impl<'a> Iterator for EntriesFields<'a> {
    type Item = io::Result<EntryFields<'a>>;

    fn next(&mut self) -> Option<io::Result<EntryFields<'a>>> {
        let inner = &self.archive.inner;

        // If we hit a previous error, or we reached the end, we're done here
        if inner.done.get() {
            return None;
        }

        // The previous entry shares our cursor, so it must be gone before we
        // move it. This isn't fatal; the caller may drop it and try again.
        if inner.claimed.get() {
            return Some(Err(misuse(
                "previous entry must be dropped before requesting the next one",
            )));
        }

        try_iter!(inner, inner.drain());

        let offset = inner.pos.get();
        let mut block = [0; BLOCK_SIZE];
        if !try_iter!(inner, inner.read_block(&mut block)) {
            tracing::debug!(offset, "archive ended without an end-of-archive marker");
            inner.done.set(true);
            return None;
        }

        // Anything without the magic ends the archive. A zero block opens the
        // end-of-archive marker, whose second block is consumed too.
        let header = match try_iter!(inner, Header::from_block(&block)) {
            Some(header) => header,
            None => {
                tracing::debug!(offset, "reached end of archive");
                if is_zero_block(&block) {
                    try_iter!(inner, inner.read_block(&mut block));
                    if !is_zero_block(&block) {
                        tracing::debug!("second end-of-archive block isn't zeroed");
                    }
                }
                inner.done.set(true);
                return None;
            }
        };
        tracing::trace!(
            offset,
            path = header.path(),
            size = header.size(),
            "read entry header"
        );

        inner.framing.set(Framing::new(header.size()));
        inner.claimed.set(true);
        Some(Ok(EntryFields {
            header,
            pax: None,
            archive: inner,
        }))
    }
}

impl<'a, R: ?Sized + Read> Read for &'a ArchiveInner<R> {
    fn read(&mut self, into: &mut [u8]) -> io::Result<usize> {
        self.obj.borrow_mut().read(into).map(|i| {
            self.pos.set(self.pos.get() + i as u64);
            i
        })
    }
}
