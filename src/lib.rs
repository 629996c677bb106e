//! A library for reading and writing USTAR archives
//!
//! This library provides utilities necessary to manage TAR archives [1] in
//! the POSIX USTAR format, abstracted over a reader or writer. An archive is
//! never required to be fully resident in memory: headers are decoded one
//! block at a time and payloads are streamed straight between the underlying
//! object and the caller.
//!
//! Reading goes through [`Archive`], whose [`entries`](Archive::entries)
//! iterator yields one [`Entry`] at a time. Writing goes through
//! [`Builder`], which opens one [`EntryWriter`] at a time. With the `async`
//! feature (on by default) the [`aio`] module offers the same over tokio's
//! `AsyncRead` and `AsyncWrite`.
//!
//! Extensions beyond USTAR are not supported: GNU long names and PAX records
//! are never applied, paths are limited to 255 bytes, and `x`/`g` entries
//! are handed to the caller like any other entry.
//!
//! [1]: http://en.wikipedia.org/wiki/Tar_%28computing%29

#![deny(missing_docs)]

pub use crate::archive::{Archive, Entries};
pub use crate::builder::{Builder, EntryWriter};
pub use crate::defaults::{HeaderDefaults, NewEntry};
pub use crate::entry::{Chunks, Entry, DEFAULT_CHUNK_SIZE};
pub use crate::entry_type::EntryType;
pub use crate::error::{TarError, TarErrorKind};
pub use crate::framing::padding_for;
pub use crate::header::{split_path, Header};
pub use crate::layout::BLOCK_SIZE;
pub use crate::pax::{PaxRecord, PaxRecords};

mod archive;
mod builder;
mod defaults;
mod entry;
mod entry_type;
mod error;
mod framing;
mod header;
pub mod layout;
pub mod mode;
mod pax;

#[cfg(feature = "async")]
pub mod aio;
