use std::future::poll_fn;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::misuse;
use crate::framing::closing_padding;
use crate::layout::{BLOCK_SIZE, TERMINATOR_SIZE};
use crate::{HeaderDefaults, NewEntry};

/// An archive written to an `AsyncWrite`.
///
/// Unlike [`Builder`](crate::Builder) nothing is written on drop: the
/// end-of-archive marker is only emitted by [`AsyncBuilder::finish`] or
/// [`AsyncBuilder::into_inner`].
pub struct AsyncBuilder<W: AsyncWrite + Unpin> {
    defaults: HeaderDefaults,
    open: bool,
    finished: bool,
    obj: W,
}

/// The payload sink of an entry opened with [`AsyncBuilder::open`].
///
/// The padding is written by [`AsyncEntryWriter::finish`] or by shutting the
/// writer down through `AsyncWrite`, which also flushes. A writer dropped
/// without either leaves the entry open and the next call to `open` fails.
pub struct AsyncEntryWriter<'a, W: AsyncWrite + Unpin> {
    builder: &'a mut AsyncBuilder<W>,
    path: String,
    declared: u64,
    written: u64,
    // Padding still owed once closing has started.
    pad: Option<usize>,
    closed: bool,
}

impl<W: AsyncWrite + Unpin> AsyncBuilder<W> {
    /// Create a new archive builder writing to `obj` with the default header
    /// values.
    pub fn new(obj: W) -> AsyncBuilder<W> {
        AsyncBuilder::with_defaults(obj, HeaderDefaults::default())
    }

    /// Create a new archive builder filling unset header fields from
    /// `defaults`.
    pub fn with_defaults(obj: W, defaults: HeaderDefaults) -> AsyncBuilder<W> {
        AsyncBuilder {
            defaults,
            open: false,
            finished: false,
            obj,
        }
    }

    /// Returns the defaults applied to new entries.
    pub fn defaults(&self) -> &HeaderDefaults {
        &self.defaults
    }

    /// Writes the header of a new entry and returns the sink for its payload.
    ///
    /// Fails the same way as [`Builder::open`](crate::Builder::open).
    pub async fn open(&mut self, entry: NewEntry) -> io::Result<AsyncEntryWriter<'_, W>> {
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
        self.obj.write_all(&block).await?;
        tracing::trace!(path = header.path(), size = header.size(), "wrote entry header");

        self.open = true;
        Ok(AsyncEntryWriter {
            builder: self,
            declared: header.size(),
            path: header.path().to_string(),
            written: 0,
            pad: None,
            closed: false,
        })
    }

    /// Adds an entry whose payload is `data`, setting its size accordingly.
    pub async fn append_data(&mut self, entry: NewEntry, data: &[u8]) -> io::Result<()> {
        let mut w = self.open(entry.size(data.len() as u64)).await?;
        w.write_all(data).await?;
        w.finish().await
    }

    /// Adds an entry whose payload is the UTF-8 text `data`.
    pub async fn append_str(&mut self, entry: NewEntry, data: &str) -> io::Result<()> {
        self.append_data(entry, data.as_bytes()).await
    }

    /// Adds an entry whose payload is copied from `data` until it is
    /// exhausted, returning the number of bytes copied.
    ///
    /// The size of `entry` must be set and must match what `data` yields.
    pub async fn append_reader<R: AsyncRead + Unpin>(
        &mut self,
        entry: NewEntry,
        mut data: R,
    ) -> io::Result<u64> {
        let mut w = self.open(entry).await?;
        let n = tokio::io::copy(&mut data, &mut w).await?;
        w.finish().await?;
        Ok(n)
    }

    /// Finish writing this archive, emitting the termination sections and
    /// flushing the writer. Calling it again does nothing.
    pub async fn finish(&mut self) -> io::Result<()> {
        if self.open {
            return Err(misuse("cannot finish an archive with an entry still open"));
        }
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        tracing::debug!("writing end-of-archive marker");
        self.obj.write_all(&[0; TERMINATOR_SIZE]).await?;
        self.obj.flush().await
    }

    /// Finishes the archive if needed and returns the underlying object.
    pub async fn into_inner(mut self) -> io::Result<W> {
        self.finish().await?;
        Ok(self.obj)
    }
}

impl<'a, W: AsyncWrite + Unpin> AsyncEntryWriter<'a, W> {
    /// Returns how many payload bytes have been written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Closes the entry, writing the padding that completes its last block.
    pub async fn finish(mut self) -> io::Result<()> {
        poll_fn(|cx| self.poll_close(cx)).await
    }

    fn poll_close(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.closed {
            return Poll::Ready(Ok(()));
        }
        let mut pad = *self
            .pad
            .get_or_insert_with(|| closing_padding(&self.path, self.declared, self.written));
        let zeros = [0; BLOCK_SIZE];
        while pad > 0 {
            let n = ready!(Pin::new(&mut self.builder.obj).poll_write(cx, &zeros[..pad]))?;
            if n == 0 {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write entry padding",
                )));
            }
            pad -= n;
            self.pad = Some(pad);
        }
        self.closed = true;
        self.builder.open = false;
        Poll::Ready(Ok(()))
    }
}

impl<'a, W: AsyncWrite + Unpin> AsyncWrite for AsyncEntryWriter<'a, W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let me = self.get_mut();
        if me.closed || me.pad.is_some() {
            return Poll::Ready(Err(misuse("entry has already been closed")));
        }
        let n = ready!(Pin::new(&mut me.builder.obj).poll_write(cx, buf))?;
        me.written += n as u64;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().builder.obj).poll_flush(cx)
    }

    // Closes the entry only; the archive goes on.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        ready!(me.poll_close(cx))?;
        Pin::new(&mut me.builder.obj).poll_flush(cx)
    }
}
