use std::cmp;
use std::io;
use std::io::prelude::*;
use std::marker;

use crate::archive::ArchiveInner;
use crate::pax::PaxRecords;
use crate::{Archive, Header};

/// Allocation size used by [`Entry::next_chunk`] when asked for chunks of 0
/// bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// A read-only view into an entry of an archive.
///
/// This structure is a window into a portion of a borrowed archive which can
/// be inspected. It acts as a file handle by implementing the `Read` trait:
/// bytes are read straight into the caller's buffer, one read of the
/// underlying object per call. [`Entry::next_chunk`] and [`Entry::chunks`]
/// allocate the buffers instead.
///
/// Whatever is left unread when the entry is dropped is skipped before the
/// next entry's header is read.
pub struct Entry<'a, R: 'a + Read> {
    fields: EntryFields<'a>,
    _ignored: marker::PhantomData<&'a Archive<R>>,
}

// private implementation detail of `Entry`, but concrete (no type parameters)
// and also all-public to be constructed from other modules.
pub(crate) struct EntryFields<'a> {
    pub(crate) header: Header,
    pub(crate) pax: Option<Vec<u8>>,
    pub(crate) archive: &'a ArchiveInner<dyn Read + 'a>,
}

/// An iterator over the payload of an entry in owned chunks.
///
/// Created by [`Entry::chunks`].
pub struct Chunks<'a, R: 'a + Read> {
    entry: Entry<'a, R>,
    size: usize,
    done: bool,
}

impl<'a, R: Read> Entry<'a, R> {
    /// Returns access to the header of this entry in the archive.
    pub fn header(&self) -> &Header {
        &self.fields.header
    }

    /// Returns the path name for this entry, `prefix` and `name` joined.
    pub fn path(&self) -> &str {
        self.fields.header.path()
    }

    /// Returns the payload size declared by the header.
    pub fn size(&self) -> u64 {
        self.fields.header.size()
    }

    /// Returns how many payload bytes haven't been read yet.
    pub fn remaining(&self) -> u64 {
        self.fields.archive.framing().remaining()
    }

    /// Reads the next chunk of at most `max` payload bytes into a freshly
    /// allocated buffer, or `None` once the payload is exhausted.
    ///
    /// A `max` of 0 means [`DEFAULT_CHUNK_SIZE`].
    pub fn next_chunk(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        self.fields.next_chunk(max)
    }

    /// Turns this entry into an iterator over chunks of at most `size` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use ustar::{Archive, Builder, NewEntry};
    ///
    /// let mut ar = Builder::new(Vec::new());
    /// ar.append_data(NewEntry::new("zeros"), &[0; 3000][..]).unwrap();
    /// let data = ar.into_inner().unwrap();
    ///
    /// let mut ar = Archive::new(&data[..]);
    /// let entry = ar.entries().unwrap().next().unwrap().unwrap();
    /// let lens = entry
    ///     .chunks(1024)
    ///     .map(|c| c.unwrap().len())
    ///     .collect::<Vec<_>>();
    /// assert_eq!(lens, [1024, 1024, 952]);
    /// ```
    pub fn chunks(self, size: usize) -> Chunks<'a, R> {
        Chunks {
            entry: self,
            size,
            done: false,
        }
    }

    /// Returns an iterator over the records of a PAX extended header.
    ///
    /// `None` is returned unless this entry is itself a local (`x`) or
    /// global (`g`) extended header. The records are not applied to the
    /// entry they describe.
    ///
    /// Note that this reads the entire payload of the entry.
    pub fn pax_records(&mut self) -> io::Result<Option<PaxRecords>> {
        self.fields.pax_records()
    }

    /// Stops reading this entry and skips whatever is left of it.
    ///
    /// The skip happens right away, so errors from the underlying reader are
    /// reported here rather than on the next call to the iterator.
    pub fn cancel(self) -> io::Result<()> {
        self.fields.archive.cancel()
    }
}

impl<'a, R: Read> Read for Entry<'a, R> {
    fn read(&mut self, into: &mut [u8]) -> io::Result<usize> {
        self.fields.read(into)
    }
}

impl<'a, R: Read> Iterator for Chunks<'a, R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<io::Result<Vec<u8>>> {
        if self.done {
            return None;
        }
        match self.entry.next_chunk(self.size) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> EntryFields<'a> {
    pub(crate) fn into_entry<R: Read>(self) -> Entry<'a, R> {
        Entry {
            fields: self,
            _ignored: marker::PhantomData,
        }
    }

    fn next_chunk(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        let framing = self.archive.framing();
        let mut buf = if framing.is_draining() {
            Vec::new()
        } else {
            let max = if max == 0 { DEFAULT_CHUNK_SIZE } else { max };
            vec![0; framing.request(max)]
        };
        match self.archive.pull(&mut buf)? {
            0 => Ok(None),
            n => {
                buf.truncate(n);
                Ok(Some(buf))
            }
        }
    }

    fn read_all(&mut self) -> io::Result<Vec<u8>> {
        // Preallocate some data but don't let ourselves get too crazy now.
        let cap = cmp::min(self.header.size(), 128 * 1024);
        let mut v = Vec::with_capacity(cap as usize);
        self.read_to_end(&mut v).map(|_| v)
    }

    fn pax_records(&mut self) -> io::Result<Option<PaxRecords>> {
        let kind = self.header.entry_type();
        if !kind.is_pax_local_extensions() && !kind.is_pax_global_extensions() {
            return Ok(None);
        }
        let data = match self.pax.take() {
            Some(data) => data,
            None => self.read_all()?,
        };
        Ok(Some(PaxRecords::new(self.pax.insert(data))))
    }
}

impl<'a> Read for EntryFields<'a> {
    fn read(&mut self, into: &mut [u8]) -> io::Result<usize> {
        self.archive.pull(into)
    }
}

impl<'a> Drop for EntryFields<'a> {
    fn drop(&mut self) {
        self.archive.release();
    }
}
