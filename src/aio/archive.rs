use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::entry::DEFAULT_CHUNK_SIZE;
use crate::error::unexpected_eof;
use crate::framing::Framing;
use crate::layout::BLOCK_SIZE;
use crate::header::is_zero_block;
use crate::Header;

const SKIP_BUFFER_SIZE: usize = 32 * 1024;

/// An archive read from an `AsyncRead`.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// use tokio::io::AsyncReadExt;
/// use ustar::aio::{AsyncArchive, AsyncBuilder};
/// use ustar::NewEntry;
///
/// let mut ar = AsyncBuilder::new(Vec::new());
/// ar.append_str(NewEntry::new("a.txt"), "hello").await?;
/// let data = ar.into_inner().await?;
///
/// let mut ar = AsyncArchive::new(&data[..]);
/// while let Some(mut entry) = ar.next_entry().await? {
///     let mut s = String::new();
///     entry.read_to_string(&mut s).await?;
///     assert_eq!(s, "hello");
/// }
/// # Ok(())
/// # }
/// ```
pub struct AsyncArchive<R: AsyncRead + Unpin> {
    obj: R,
    pos: u64,
    framing: Framing,
    done: bool,
}

/// An entry lent out by [`AsyncArchive::next_entry`].
///
/// Reading goes straight into the caller's buffer through `AsyncRead`;
/// [`AsyncEntry::next_chunk`] allocates instead. Unread payload is skipped
/// by the next call to `next_entry`.
pub struct AsyncEntry<'a, R: AsyncRead + Unpin> {
    archive: &'a mut AsyncArchive<R>,
    header: Header,
}

impl<R: AsyncRead + Unpin> AsyncArchive<R> {
    /// Create a new archive with the underlying object as the reader.
    pub fn new(obj: R) -> AsyncArchive<R> {
        AsyncArchive {
            obj,
            pos: 0,
            framing: Framing::default(),
            done: false,
        }
    }

    /// Unwrap this archive, returning the underlying object.
    pub fn into_inner(self) -> R {
        self.obj
    }

    /// Skips whatever the previous entry left unread and reads the next
    /// header.
    ///
    /// Returns `Ok(None)` at the end-of-archive marker, when the reader is
    /// exhausted on a block boundary, and on every call after an error. Both
    /// blocks of the marker are consumed.
    pub async fn next_entry(&mut self) -> io::Result<Option<AsyncEntry<'_, R>>> {
        if self.done {
            return Ok(None);
        }
        match self.read_header().await {
            Ok(Some(header)) => {
                self.framing = Framing::new(header.size());
                Ok(Some(AsyncEntry {
                    archive: self,
                    header,
                }))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    async fn read_header(&mut self) -> io::Result<Option<Header>> {
        self.drain().await?;

        let offset = self.pos;
        let mut block = [0; BLOCK_SIZE];
        if !self.read_block(&mut block).await? {
            tracing::debug!(offset, "archive ended without an end-of-archive marker");
            return Ok(None);
        }

        let header = Header::from_block(&block)?;
        match &header {
            Some(header) => tracing::trace!(
                offset,
                path = header.path(),
                size = header.size(),
                "read entry header"
            ),
            None => {
                tracing::debug!(offset, "reached end of archive");
                if is_zero_block(&block) {
                    self.read_block(&mut block).await?;
                    if !is_zero_block(&block) {
                        tracing::debug!("second end-of-archive block isn't zeroed");
                    }
                }
            }
        }
        Ok(header)
    }

    /// Fills `block`, returning `false` if the reader is exhausted before the
    /// first byte.
    async fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> io::Result<bool> {
        let mut read = 0;
        while read < block.len() {
            match self.obj.read(&mut block[read..]).await? {
                0 if read == 0 => return Ok(false),
                0 => {
                    return Err(unexpected_eof(format!(
                        "archive ended {} bytes into a header block",
                        read
                    )))
                }
                n => {
                    read += n;
                    self.pos += n as u64;
                }
            }
        }
        Ok(true)
    }

    async fn drain(&mut self) -> io::Result<()> {
        poll_fn(|cx| self.poll_drain(cx)).await
    }

    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.framing.owed() > 0 {
            tracing::trace!(offset = self.pos, bytes = self.framing.owed(), "skipping rest of entry");
        }
        let mut buf = [0u8; SKIP_BUFFER_SIZE];
        while self.framing.owed() > 0 {
            let mut skip = ReadBuf::new(&mut buf[..self.framing.request(SKIP_BUFFER_SIZE)]);
            ready!(Pin::new(&mut self.obj).poll_read(cx, &mut skip))?;
            let n = skip.filled().len();
            if n == 0 {
                return Poll::Ready(Err(unexpected_eof("unexpected EOF during skip")));
            }
            self.pos += n as u64;
            self.framing.consume(n);
        }
        self.framing = Framing::default();
        Poll::Ready(Ok(()))
    }

    fn poll_pull(&mut self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if self.framing.is_draining() {
            return self.poll_drain(cx);
        }
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let want = self.framing.request(buf.remaining());
        let n = {
            let mut dst = ReadBuf::new(buf.initialize_unfilled_to(want));
            ready!(Pin::new(&mut self.obj).poll_read(cx, &mut dst))?;
            dst.filled().len()
        };
        if n == 0 {
            return Poll::Ready(Err(unexpected_eof(format!(
                "archive ended with {} bytes of entry data still to come",
                self.framing.remaining()
            ))));
        }
        self.pos += n as u64;
        buf.advance(self.framing.consume(n));
        Poll::Ready(Ok(()))
    }
}

impl<'a, R: AsyncRead + Unpin> AsyncEntry<'a, R> {
    /// Returns access to the header of this entry in the archive.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the path name for this entry, `prefix` and `name` joined.
    pub fn path(&self) -> &str {
        self.header.path()
    }

    /// Returns the payload size declared by the header.
    pub fn size(&self) -> u64 {
        self.header.size()
    }

    /// Returns how many payload bytes haven't been read yet.
    pub fn remaining(&self) -> u64 {
        self.archive.framing.remaining()
    }

    /// Reads the next chunk of at most `max` payload bytes into a freshly
    /// allocated buffer, or `None` once the payload is exhausted.
    ///
    /// A `max` of 0 means [`DEFAULT_CHUNK_SIZE`](crate::DEFAULT_CHUNK_SIZE).
    pub async fn next_chunk(&mut self, max: usize) -> io::Result<Option<Vec<u8>>> {
        if self.archive.framing.is_draining() {
            self.archive.drain().await?;
            return Ok(None);
        }
        let max = if max == 0 { DEFAULT_CHUNK_SIZE } else { max };
        let mut buf = vec![0; self.archive.framing.request(max)];
        let n = self.read(&mut buf).await?;
        buf.truncate(n);
        Ok(Some(buf))
    }

    /// Stops reading this entry and skips whatever is left of it.
    pub async fn cancel(self) -> io::Result<()> {
        tracing::debug!(remaining = self.remaining(), "cancelling entry");
        self.archive.framing.cancel();
        self.archive.drain().await
    }
}

impl<'a, R: AsyncRead + Unpin> AsyncRead for AsyncEntry<'a, R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.get_mut().archive.poll_pull(cx, buf)
    }
}
