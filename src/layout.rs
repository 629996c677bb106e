//! Byte layout of a USTAR header block.
//!
//! See https://en.wikipedia.org/wiki/Tar_%28computing%29#UStar_format

use std::ops::Range;

/// Size of a block, the only alignment unit of an archive.
pub const BLOCK_SIZE: usize = 512;

/// A fixed region of a header block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    /// Offset of the first byte of the field.
    pub offset: usize,
    /// Width of the field in bytes.
    pub len: usize,
}

impl Field {
    const fn new(offset: usize, len: usize) -> Field {
        Field { offset, len }
    }

    /// Returns the byte range this field covers within a block.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Returns a view of this field within `block`.
    pub fn of<'a>(&self, block: &'a [u8; BLOCK_SIZE]) -> &'a [u8] {
        &block[self.range()]
    }

    /// Returns a mutable view of this field within `block`.
    pub fn of_mut<'a>(&self, block: &'a mut [u8; BLOCK_SIZE]) -> &'a mut [u8] {
        &mut block[self.range()]
    }
}

#[allow(missing_docs)]
pub const NAME: Field = Field::new(0, 100);
#[allow(missing_docs)]
pub const MODE: Field = Field::new(100, 8);
#[allow(missing_docs)]
pub const UID: Field = Field::new(108, 8);
#[allow(missing_docs)]
pub const GID: Field = Field::new(116, 8);
#[allow(missing_docs)]
pub const SIZE: Field = Field::new(124, 12);
#[allow(missing_docs)]
pub const MTIME: Field = Field::new(136, 12);
#[allow(missing_docs)]
pub const CHECKSUM: Field = Field::new(148, 8);
#[allow(missing_docs)]
pub const TYPEFLAG: Field = Field::new(156, 1);
#[allow(missing_docs)]
pub const LINKNAME: Field = Field::new(157, 100);
#[allow(missing_docs)]
pub const MAGIC: Field = Field::new(257, 6);
#[allow(missing_docs)]
pub const VERSION: Field = Field::new(263, 2);
#[allow(missing_docs)]
pub const UNAME: Field = Field::new(265, 32);
#[allow(missing_docs)]
pub const GNAME: Field = Field::new(297, 32);
#[allow(missing_docs)]
pub const DEVMAJOR: Field = Field::new(329, 8);
#[allow(missing_docs)]
pub const DEVMINOR: Field = Field::new(337, 8);
#[allow(missing_docs)]
pub const PREFIX: Field = Field::new(345, 155);

/// Magic written into every header.
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version written after the magic.
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Only this much of the magic is compared on read, which also admits the
/// old GNU `"ustar  \0"` spelling.
pub const MAGIC_CHECKED: usize = 5;

/// Longest path that can be stored across `name` and `prefix`.
///
/// Paths of 256 bytes or more are always rejected.
pub const PATH_MAX: usize = NAME.len + PREFIX.len;

/// Size of the all-zero trailer closing an archive.
pub const TERMINATOR_SIZE: usize = 2 * BLOCK_SIZE;
