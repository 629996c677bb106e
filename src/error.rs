use std::borrow::Cow;
use std::io;

/// The kind of failure reported by a [`TarError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TarErrorKind {
    /// A header block is malformed: it isn't 512 bytes long, its checksum
    /// doesn't match, its type flag is unknown or a numeric field can't be
    /// parsed.
    Format,
    /// A path can't be split into the `name` and `prefix` fields.
    NameTooLong,
    /// A header value doesn't fit into its field.
    InvalidField,
    /// The underlying stream ended while payload or padding bytes were still
    /// owed.
    UnexpectedEof,
    /// The archive was driven out of order, for example a new entry was
    /// requested while the previous one was still held open.
    Misuse,
}

/// Error raised by this crate, always delivered wrapped in an `io::Error`.
///
/// Use [`TarError::kind_of`] to recover the kind from an `io::Error` returned
/// by any of the reading or writing operations.
#[derive(Debug, thiserror::Error)]
#[error("{desc}")]
pub struct TarError {
    kind: TarErrorKind,
    desc: Cow<'static, str>,
}

impl TarError {
    /// Creates a new error of the given kind.
    pub fn new<D: Into<Cow<'static, str>>>(kind: TarErrorKind, desc: D) -> TarError {
        TarError {
            kind,
            desc: desc.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> TarErrorKind {
        self.kind
    }

    /// Returns the kind of the `TarError` wrapped in `err`, if any.
    ///
    /// Plain I/O errors from the underlying reader or writer return `None`.
    pub fn kind_of(err: &io::Error) -> Option<TarErrorKind> {
        err.get_ref()
            .and_then(|e| e.downcast_ref::<TarError>())
            .map(|e| e.kind)
    }
}

impl From<TarError> for io::Error {
    fn from(err: TarError) -> io::Error {
        let kind = match err.kind {
            TarErrorKind::Format => io::ErrorKind::InvalidData,
            TarErrorKind::NameTooLong | TarErrorKind::InvalidField => io::ErrorKind::InvalidInput,
            TarErrorKind::UnexpectedEof => io::ErrorKind::UnexpectedEof,
            TarErrorKind::Misuse => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub(crate) fn bad_archive<D: Into<Cow<'static, str>>>(desc: D) -> io::Error {
    TarError::new(TarErrorKind::Format, desc).into()
}

pub(crate) fn name_too_long<D: Into<Cow<'static, str>>>(desc: D) -> io::Error {
    TarError::new(TarErrorKind::NameTooLong, desc).into()
}

pub(crate) fn invalid_field<D: Into<Cow<'static, str>>>(desc: D) -> io::Error {
    TarError::new(TarErrorKind::InvalidField, desc).into()
}

pub(crate) fn unexpected_eof<D: Into<Cow<'static, str>>>(desc: D) -> io::Error {
    TarError::new(TarErrorKind::UnexpectedEof, desc).into()
}

pub(crate) fn misuse<D: Into<Cow<'static, str>>>(desc: D) -> io::Error {
    TarError::new(TarErrorKind::Misuse, desc).into()
}
