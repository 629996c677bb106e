//! Permission bits stored in the `mode` field.

#![allow(missing_docs)]

pub const OWNER_ALL: u32 = 0o700;
pub const OWNER_READ: u32 = 0o400;
pub const OWNER_WRITE: u32 = 0o200;
pub const OWNER_EXEC: u32 = 0o100;

pub const GROUP_ALL: u32 = 0o070;
pub const GROUP_READ: u32 = 0o040;
pub const GROUP_WRITE: u32 = 0o020;
pub const GROUP_EXEC: u32 = 0o010;

pub const OTHER_ALL: u32 = 0o007;
pub const OTHER_READ: u32 = 0o004;
pub const OTHER_WRITE: u32 = 0o002;
pub const OTHER_EXEC: u32 = 0o001;

pub const ALL: u32 = 0o777;

pub const SET_UID: u32 = 0o4000;
pub const SET_GID: u32 = 0o2000;
pub const STICKY: u32 = 0o1000;

/// Every bit that fits in the field; anything above is dropped on write.
pub const MASK: u32 = 0o7777;

/// `rw-r--r--`, the mode given to entries that don't set one.
pub const DEFAULT: u32 = OWNER_READ | OWNER_WRITE | GROUP_READ | OTHER_READ;
