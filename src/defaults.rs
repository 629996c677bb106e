use std::io;

use filetime::FileTime;

use crate::error::invalid_field;
use crate::{mode, EntryType, Header};

/// Header values applied by a writer to every field an entry leaves unset.
///
/// The defaults are `rw-r--r--` permissions, uid and gid 1000, owner and
/// group name `"ustar"`, regular file type, no link target and device
/// numbers of 0.
///
/// # Examples
///
/// ```
/// use ustar::{Builder, HeaderDefaults};
///
/// let defaults = HeaderDefaults::default().uid(0).gid(0).username("root").groupname("root");
/// let ar = Builder::with_defaults(Vec::new(), defaults);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderDefaults {
    mode: u32,
    uid: u64,
    gid: u64,
    entry_type: EntryType,
    link_name: String,
    username: String,
    groupname: String,
    dev_major: u32,
    dev_minor: u32,
}

impl Default for HeaderDefaults {
    fn default() -> HeaderDefaults {
        HeaderDefaults {
            mode: mode::DEFAULT,
            uid: 1000,
            gid: 1000,
            entry_type: EntryType::Regular,
            link_name: String::new(),
            username: "ustar".to_string(),
            groupname: "ustar".to_string(),
            dev_major: 0,
            dev_minor: 0,
        }
    }
}

impl HeaderDefaults {
    /// Default permission bits.
    pub fn mode(mut self, mode: u32) -> HeaderDefaults {
        self.mode = mode;
        self
    }

    /// Default owner ID.
    pub fn uid(mut self, uid: u64) -> HeaderDefaults {
        self.uid = uid;
        self
    }

    /// Default group ID.
    pub fn gid(mut self, gid: u64) -> HeaderDefaults {
        self.gid = gid;
        self
    }

    /// Default entry type.
    pub fn entry_type(mut self, ty: EntryType) -> HeaderDefaults {
        self.entry_type = ty;
        self
    }

    /// Default link target.
    pub fn link_name<S: Into<String>>(mut self, name: S) -> HeaderDefaults {
        self.link_name = name.into();
        self
    }

    /// Default owner name.
    pub fn username<S: Into<String>>(mut self, name: S) -> HeaderDefaults {
        self.username = name.into();
        self
    }

    /// Default group name.
    pub fn groupname<S: Into<String>>(mut self, name: S) -> HeaderDefaults {
        self.groupname = name.into();
        self
    }

    /// Default device major and minor numbers.
    pub fn device(mut self, major: u32, minor: u32) -> HeaderDefaults {
        self.dev_major = major;
        self.dev_minor = minor;
        self
    }

    /// A header carrying these defaults, with the modification time left at
    /// the epoch.
    pub(crate) fn header(&self, path: String, size: u64) -> Header {
        let mut header = Header::blank(path, size);
        header.set_mode(self.mode);
        header.set_uid(self.uid);
        header.set_gid(self.gid);
        header.set_entry_type(self.entry_type);
        header.set_link_name(self.link_name.clone());
        header.set_username(self.username.clone());
        header.set_groupname(self.groupname.clone());
        header.set_device_major(self.dev_major);
        header.set_device_minor(self.dev_minor);
        header
    }

    /// Builds the full header for `entry`, taking every unset field from
    /// these defaults and stamping the current time when no `mtime` was
    /// given.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidField` if the entry has no size.
    pub fn apply(&self, entry: NewEntry) -> io::Result<Header> {
        let size = match entry.size {
            Some(size) => size,
            None => {
                return Err(invalid_field(format!(
                    "size of entry `{}` must be known before it is written",
                    entry.path
                )))
            }
        };
        let mut header = Header::blank(entry.path, size);
        header.set_mode(entry.mode.unwrap_or(self.mode));
        header.set_uid(entry.uid.unwrap_or(self.uid));
        header.set_gid(entry.gid.unwrap_or(self.gid));
        header.set_mtime(entry.mtime.unwrap_or_else(FileTime::now));
        header.set_entry_type(entry.entry_type.unwrap_or(self.entry_type));
        header.set_link_name(entry.link_name.unwrap_or_else(|| self.link_name.clone()));
        header.set_username(entry.username.unwrap_or_else(|| self.username.clone()));
        header.set_groupname(entry.groupname.unwrap_or_else(|| self.groupname.clone()));
        header.set_device_major(entry.dev_major.unwrap_or(self.dev_major));
        header.set_device_minor(entry.dev_minor.unwrap_or(self.dev_minor));
        Ok(header)
    }
}

/// A header as supplied by a caller writing an entry.
///
/// Only the path is required. The size must also be set before the entry is
/// opened, unless a convenience method like
/// [`Builder::append_data`](crate::Builder::append_data) fills it in from the
/// data. Every other field falls back to the writer's [`HeaderDefaults`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewEntry {
    path: String,
    size: Option<u64>,
    mode: Option<u32>,
    uid: Option<u64>,
    gid: Option<u64>,
    mtime: Option<FileTime>,
    entry_type: Option<EntryType>,
    link_name: Option<String>,
    username: Option<String>,
    groupname: Option<String>,
    dev_major: Option<u32>,
    dev_minor: Option<u32>,
}

impl NewEntry {
    /// Starts a header for an entry at `path`.
    pub fn new<P: Into<String>>(path: P) -> NewEntry {
        NewEntry {
            path: path.into(),
            ..NewEntry::default()
        }
    }

    /// Returns the path of this entry.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Payload size in bytes.
    pub fn size(mut self, size: u64) -> NewEntry {
        self.size = Some(size);
        self
    }

    /// Permission bits.
    pub fn mode(mut self, mode: u32) -> NewEntry {
        self.mode = Some(mode);
        self
    }

    /// Owner ID.
    pub fn uid(mut self, uid: u64) -> NewEntry {
        self.uid = Some(uid);
        self
    }

    /// Group ID.
    pub fn gid(mut self, gid: u64) -> NewEntry {
        self.gid = Some(gid);
        self
    }

    /// Modification time. Defaults to the time the entry is opened.
    pub fn mtime(mut self, mtime: FileTime) -> NewEntry {
        self.mtime = Some(mtime);
        self
    }

    /// Entry type.
    pub fn entry_type(mut self, ty: EntryType) -> NewEntry {
        self.entry_type = Some(ty);
        self
    }

    /// Link target.
    pub fn link_name<S: Into<String>>(mut self, name: S) -> NewEntry {
        self.link_name = Some(name.into());
        self
    }

    /// Owner name.
    pub fn username<S: Into<String>>(mut self, name: S) -> NewEntry {
        self.username = Some(name.into());
        self
    }

    /// Group name.
    pub fn groupname<S: Into<String>>(mut self, name: S) -> NewEntry {
        self.groupname = Some(name.into());
        self
    }

    /// Device major and minor numbers.
    pub fn device(mut self, major: u32, minor: u32) -> NewEntry {
        self.dev_major = Some(major);
        self.dev_minor = Some(minor);
        self
    }
}

impl From<Header> for NewEntry {
    fn from(header: Header) -> NewEntry {
        NewEntry {
            size: Some(header.size()),
            mode: Some(header.mode()),
            uid: Some(header.uid()),
            gid: Some(header.gid()),
            mtime: Some(header.mtime()),
            entry_type: Some(header.entry_type()),
            link_name: Some(header.link_name().to_string()),
            username: Some(header.username().to_string()),
            groupname: Some(header.groupname().to_string()),
            dev_major: Some(header.device_major()),
            dev_minor: Some(header.device_minor()),
            path: header.path().to_string(),
        }
    }
}
