//! Readers and writers for archives carried by tokio's `AsyncRead` and
//! `AsyncWrite`.
//!
//! These share their framing with the blocking [`Archive`](crate::Archive)
//! and [`Builder`](crate::Builder). Entries are lent out of `&mut` borrows of
//! the archive or builder, so at most one can be alive at a time.

mod archive;
mod builder;

pub use self::archive::{AsyncArchive, AsyncEntry};
pub use self::builder::{AsyncBuilder, AsyncEntryWriter};
