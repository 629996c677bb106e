use std::cmp;
use std::io;
use std::iter::repeat;
use std::str;

use filetime::FileTime;

use crate::error::{bad_archive, invalid_field, name_too_long};
use crate::layout::{self, Field, BLOCK_SIZE};
use crate::{mode, EntryType, HeaderDefaults};

/// Representation of the header of an entry in an archive
///
/// This is the logical record: the path is whole, numbers are numbers. The
/// split `name`/`prefix` form and the octal text only exist inside the
/// 512-byte block produced by [`Header::to_block`] and consumed by
/// [`Header::from_block`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    path: String,
    mode: u32,
    uid: u64,
    gid: u64,
    size: u64,
    mtime: FileTime,
    entry_type: EntryType,
    link_name: String,
    username: String,
    groupname: String,
    dev_major: u32,
    dev_minor: u32,
}

impl Header {
    /// Creates a header for a regular file of `size` bytes at `path`.
    ///
    /// The remaining fields carry the values of
    /// [`HeaderDefaults::default`], except for the modification time which
    /// is left at the epoch.
    pub fn new<P: Into<String>>(path: P, size: u64) -> Header {
        HeaderDefaults::default().header(path.into(), size)
    }

    /// A header with every field other than `path` and `size` zeroed.
    pub(crate) fn blank(path: String, size: u64) -> Header {
        Header {
            path,
            mode: 0,
            uid: 0,
            gid: 0,
            size,
            mtime: FileTime::zero(),
            entry_type: EntryType::Regular,
            link_name: String::new(),
            username: String::new(),
            groupname: String::new(),
            dev_major: 0,
            dev_minor: 0,
        }
    }

    /// Returns the path name stored in this header.
    ///
    /// When the archive split the path into `prefix` and `name`, this is the
    /// two joined back together with a `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Sets the path name for this header.
    ///
    /// The path is only checked against the field widths when the header is
    /// encoded.
    pub fn set_path<P: Into<String>>(&mut self, path: P) {
        self.path = path.into();
    }

    /// Returns the mode bits for this file
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Sets the mode bits; bits above `mode::MASK` are dropped on encode.
    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    /// Returns the value of the owner's user ID field
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Sets the owner's user ID.
    pub fn set_uid(&mut self, uid: u64) {
        self.uid = uid;
    }

    /// Returns the value of the group's user ID field
    pub fn gid(&self) -> u64 {
        self.gid
    }

    /// Sets the group ID.
    pub fn set_gid(&mut self, gid: u64) {
        self.gid = gid;
    }

    /// Returns the file size this header represents.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Sets the payload size.
    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    /// Returns the last modification time.
    ///
    /// Headers decoded from an archive only carry whole seconds.
    pub fn mtime(&self) -> FileTime {
        self.mtime
    }

    /// Sets the last modification time; sub-second precision is dropped on
    /// encode.
    pub fn set_mtime(&mut self, mtime: FileTime) {
        self.mtime = mtime;
    }

    /// Returns the type of file described by this header.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Sets the type of file that will be described by this header.
    pub fn set_entry_type(&mut self, ty: EntryType) {
        self.entry_type = ty;
    }

    /// Returns the link target, empty for entries that aren't links.
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Sets the link target.
    pub fn set_link_name<P: Into<String>>(&mut self, name: P) {
        self.link_name = name.into();
    }

    /// Returns the username of the owner of this file.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Sets the username of the owner.
    pub fn set_username<P: Into<String>>(&mut self, name: P) {
        self.username = name.into();
    }

    /// Returns the group name of the owner of this file.
    pub fn groupname(&self) -> &str {
        &self.groupname
    }

    /// Sets the group name of the owner.
    pub fn set_groupname<P: Into<String>>(&mut self, name: P) {
        self.groupname = name.into();
    }

    /// Returns the device major number.
    pub fn device_major(&self) -> u32 {
        self.dev_major
    }

    /// Sets the device major number.
    pub fn set_device_major(&mut self, major: u32) {
        self.dev_major = major;
    }

    /// Returns the device minor number.
    pub fn device_minor(&self) -> u32 {
        self.dev_minor
    }

    /// Sets the device minor number.
    pub fn set_device_minor(&mut self, minor: u32) {
        self.dev_minor = minor;
    }

    /// Encodes this header into a 512-byte block, checksum included.
    ///
    /// # Errors
    ///
    /// Fails with `NameTooLong` if the path can't be split into the `name`
    /// and `prefix` fields, and with `InvalidField` if any other value does
    /// not fit its field or a text field contains a nul byte.
    pub fn to_block(&self) -> io::Result<[u8; BLOCK_SIZE]> {
        let (name, prefix) = split_path(&self.path)?;
        let mtime = self.mtime.unix_seconds();
        if mtime < 0 {
            return Err(invalid_field(format!(
                "mtime {} is before the epoch and can't be encoded",
                mtime
            )));
        }

        let mut block = [0; BLOCK_SIZE];
        copy_into(layout::NAME.of_mut(&mut block), name, "name")?;
        octal_into(layout::MODE.of_mut(&mut block), (self.mode & mode::MASK) as u64, "mode")?;
        octal_into(layout::UID.of_mut(&mut block), self.uid, "uid")?;
        octal_into(layout::GID.of_mut(&mut block), self.gid, "gid")?;
        octal_into(layout::SIZE.of_mut(&mut block), self.size, "size")?;
        octal_into(layout::MTIME.of_mut(&mut block), mtime as u64, "mtime")?;
        block[layout::TYPEFLAG.offset] = self.entry_type.as_byte();
        copy_into(layout::LINKNAME.of_mut(&mut block), &self.link_name, "link name")?;
        layout::MAGIC
            .of_mut(&mut block)
            .copy_from_slice(layout::USTAR_MAGIC);
        layout::VERSION
            .of_mut(&mut block)
            .copy_from_slice(layout::USTAR_VERSION);
        copy_into(layout::UNAME.of_mut(&mut block), &self.username, "username")?;
        copy_into(layout::GNAME.of_mut(&mut block), &self.groupname, "group name")?;
        octal_into(layout::DEVMAJOR.of_mut(&mut block), self.dev_major as u64, "device major")?;
        octal_into(layout::DEVMINOR.of_mut(&mut block), self.dev_minor as u64, "device minor")?;
        copy_into(layout::PREFIX.of_mut(&mut block), prefix, "prefix")?;

        // Stored as six octal digits, a nul, then a space.
        let cksum = format!("{:06o}", checksum(&block));
        let field = layout::CHECKSUM.of_mut(&mut block);
        field[..6].copy_from_slice(cksum.as_bytes());
        field[6] = 0;
        field[7] = b' ';
        Ok(block)
    }

    /// Decodes a header block.
    ///
    /// Returns `Ok(None)` when the block doesn't carry the `ustar` magic.
    /// Such a block is taken to be the start of the end-of-archive marker
    /// rather than a corrupt header.
    ///
    /// # Errors
    ///
    /// Fails with `Format` if `block` isn't exactly 512 bytes long, if the
    /// checksum doesn't match, if the type flag is unknown, or if a field
    /// can't be parsed.
    pub fn from_block(block: &[u8]) -> io::Result<Option<Header>> {
        let block: &[u8; BLOCK_SIZE] = block.try_into().map_err(|_| {
            bad_archive(format!(
                "header block must be {} bytes, found {}",
                BLOCK_SIZE,
                block.len()
            ))
        })?;

        let magic = &layout::MAGIC.of(block)[..layout::MAGIC_CHECKED];
        if magic != &layout::USTAR_MAGIC[..layout::MAGIC_CHECKED] {
            return Ok(None);
        }

        let cksum = octal_from(block, layout::CHECKSUM, "checksum")?;
        if cksum != checksum(block) as u64 {
            return Err(bad_archive("archive header checksum mismatch"));
        }

        let flag = block[layout::TYPEFLAG.offset];
        let entry_type = EntryType::from_byte(flag)
            .ok_or_else(|| bad_archive(format!("unknown entry type flag {:#04x}", flag)))?;

        let name = text_from(block, layout::NAME, "name")?;
        let prefix = text_from(block, layout::PREFIX, "prefix")?;
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", prefix, name)
        };

        Ok(Some(Header {
            path,
            mode: octal_from(block, layout::MODE, "mode")? as u32,
            uid: octal_from(block, layout::UID, "uid")?,
            gid: octal_from(block, layout::GID, "gid")?,
            size: octal_from(block, layout::SIZE, "size")?,
            mtime: FileTime::from_unix_time(octal_from(block, layout::MTIME, "mtime")? as i64, 0),
            entry_type,
            link_name: text_from(block, layout::LINKNAME, "link name")?.to_string(),
            username: text_from(block, layout::UNAME, "username")?.to_string(),
            groupname: text_from(block, layout::GNAME, "group name")?.to_string(),
            dev_major: octal_from(block, layout::DEVMAJOR, "device major")? as u32,
            dev_minor: octal_from(block, layout::DEVMINOR, "device minor")? as u32,
        }))
    }
}

/// Splits `path` into the `(name, prefix)` pair stored in a header.
///
/// A single trailing `/` is dropped. Paths that fit in the 100-byte `name`
/// field are returned whole with an empty prefix. Longer paths are split at
/// the last `/` that leaves at most 155 bytes on the prefix side; the `/`
/// itself is not stored.
///
/// # Errors
///
/// Fails with `NameTooLong` if the path is longer than 255 bytes, has no
/// `/` to split at, or every possible split leaves more than 100 bytes in
/// the name.
pub fn split_path(path: &str) -> io::Result<(&str, &str)> {
    let path = path.strip_suffix('/').unwrap_or(path);
    let bytes = path.as_bytes();
    if bytes.len() <= layout::NAME.len {
        return Ok((path, ""));
    }
    if bytes.len() > layout::PATH_MAX {
        return Err(name_too_long(format!(
            "path of {} bytes is too long to insert into archive",
            bytes.len()
        )));
    }

    // A `/` at offset 155 still leaves a prefix that fits. A leading `/`
    // can't be used, the prefix would come back empty and the slash lost.
    let prefix = &bytes[..cmp::min(bytes.len(), layout::PREFIX.len + 1)];
    let pos = match prefix.iter().rposition(|&b| b == b'/') {
        Some(i) if i > 0 => i,
        _ => return Err(name_too_long("path cannot be split to be inserted into archive")),
    };
    if bytes.len() - pos - 1 > layout::NAME.len {
        return Err(name_too_long(format!(
            "file name of {} bytes left after splitting path is too long",
            bytes.len() - pos - 1
        )));
    }
    Ok((&path[pos + 1..], &path[..pos]))
}

/// Whether `block` is entirely zero, as both blocks of the end-of-archive
/// marker are.
pub(crate) fn is_zero_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|b| *b == 0)
}

/// Sums the block with the checksum field counted as eight spaces.
fn checksum(block: &[u8; BLOCK_SIZE]) -> u32 {
    let field = layout::CHECKSUM.range();
    block[..field.start]
        .iter()
        .chain(&block[field.end..])
        .fold(0, |a, b| a + (*b as u32))
        + (b' ' as u32) * (layout::CHECKSUM.len as u32)
}

fn octal_from(block: &[u8; BLOCK_SIZE], field: Field, what: &str) -> io::Result<u64> {
    let num = match str::from_utf8(truncate(field.of(block))) {
        Ok(n) => n.trim(),
        Err(_) => return Err(bad_archive(format!("{} field is not valid octal", what))),
    };
    // Writers that don't know a value leave the field blank.
    if num.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(num, 8)
        .map_err(|_| bad_archive(format!("{} field `{}` is not valid octal", what, num)))
}

fn octal_into(dst: &mut [u8], val: u64, what: &str) -> io::Result<()> {
    let o = format!("{:o}", val);
    if o.len() >= dst.len() {
        return Err(invalid_field(format!(
            "{} {} does not fit in {} octal digits",
            what,
            val,
            dst.len() - 1
        )));
    }
    let value = o.bytes().rev().chain(repeat(b'0'));
    for (slot, value) in dst.iter_mut().rev().skip(1).zip(value) {
        *slot = value;
    }
    Ok(())
}

fn text_from<'a>(block: &'a [u8; BLOCK_SIZE], field: Field, what: &str) -> io::Result<&'a str> {
    str::from_utf8(truncate(field.of(block)))
        .map(str::trim)
        .map_err(|_| bad_archive(format!("{} field is not valid utf-8", what)))
}

fn truncate(slice: &[u8]) -> &[u8] {
    match slice.iter().position(|i| *i == 0) {
        Some(i) => &slice[..i],
        None => slice,
    }
}

/// Copies `value` into the `slot` provided, returning an error if it is too
/// long or if it contains any nul bytes.
fn copy_into(slot: &mut [u8], value: &str, what: &str) -> io::Result<()> {
    let bytes = value.as_bytes();
    if bytes.len() > slot.len() {
        Err(invalid_field(format!(
            "{} of {} bytes does not fit in {} bytes",
            what,
            bytes.len(),
            slot.len()
        )))
    } else if bytes.contains(&0) {
        Err(invalid_field(format!("{} contains a nul byte", what)))
    } else {
        slot[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
