use std::io;
use std::str;

use crate::error::bad_archive;

/// An iterator over the records of a PAX extended header.
///
/// Each record has the form `"<len> <key>=<value>\n"` where `len` counts the
/// whole record, itself and the newline included. Records are located by
/// their length prefix, so values may contain newlines of their own.
///
/// After the first malformed record the iterator yields nothing more.
pub struct PaxRecords<'entry> {
    rest: &'entry [u8],
}

impl<'entry> PaxRecords<'entry> {
    /// Create new pax records iterator from the given entry data.
    pub fn new(data: &'entry [u8]) -> Self {
        PaxRecords { rest: data }
    }

    fn parse(&mut self) -> io::Result<PaxRecord<'entry>> {
        let space = self
            .rest
            .iter()
            .position(|b| *b == b' ')
            .ok_or_else(|| bad_archive("pax record has no length"))?;
        let len = str::from_utf8(&self.rest[..space])
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| bad_archive("pax record length is not a number"))?;
        if len <= space + 1 || len > self.rest.len() {
            return Err(bad_archive(format!(
                "pax record length {} doesn't fit the {} bytes left",
                len,
                self.rest.len()
            )));
        }

        let (record, rest) = self.rest.split_at(len);
        let kv = match record[space + 1..].split_last() {
            Some((b'\n', kv)) => kv,
            _ => return Err(bad_archive("pax record isn't terminated by a newline")),
        };
        let equals = kv
            .iter()
            .position(|b| *b == b'=')
            .ok_or_else(|| bad_archive("pax record has no `=`"))?;
        self.rest = rest;
        Ok(PaxRecord {
            key: &kv[..equals],
            value: &kv[equals + 1..],
        })
    }
}

/// A key/value pair from a PAX extended header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaxRecord<'entry> {
    key: &'entry [u8],
    value: &'entry [u8],
}

impl<'entry> Iterator for PaxRecords<'entry> {
    type Item = io::Result<PaxRecord<'entry>>;

    fn next(&mut self) -> Option<io::Result<PaxRecord<'entry>>> {
        // Writers may pad the payload with nuls past the last record.
        if self.rest.first().map_or(true, |b| *b == 0) {
            return None;
        }
        match self.parse() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}

impl<'entry> PaxRecord<'entry> {
    /// Returns the key of this record as a string.
    ///
    /// Fails if the key isn't utf-8.
    pub fn key(&self) -> Result<&'entry str, str::Utf8Error> {
        str::from_utf8(self.key)
    }

    /// Returns the raw bytes of the key.
    pub fn key_bytes(&self) -> &'entry [u8] {
        self.key
    }

    /// Returns the value of this record as a string.
    ///
    /// Fails if the value isn't utf-8.
    pub fn value(&self) -> Result<&'entry str, str::Utf8Error> {
        str::from_utf8(self.value)
    }

    /// Returns the raw bytes of the value.
    pub fn value_bytes(&self) -> &'entry [u8] {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records() {
        let data = b"20 path=some/file.t\n13 uid=12345\n";
        let mut records = PaxRecords::new(data);
        let r = records.next().unwrap().unwrap();
        assert_eq!(r.key(), Ok("path"));
        assert_eq!(r.value(), Ok("some/file.t"));
        let r = records.next().unwrap().unwrap();
        assert_eq!(r.key(), Ok("uid"));
        assert_eq!(r.value_bytes(), b"12345");
        assert!(records.next().is_none());
    }

    #[test]
    fn newline_in_value() {
        let data = b"16 comment=a\nbc\n";
        let r = PaxRecords::new(data).next().unwrap().unwrap();
        assert_eq!(r.value(), Ok("a\nbc"));
    }

    #[test]
    fn trailing_nuls() {
        let mut data = b"12 path=abc\n".to_vec();
        data.resize(512, 0);
        assert_eq!(PaxRecords::new(&data).count(), 1);
    }

    #[test]
    fn bad_records() {
        let bad = [
            &b"99 path=x\n"[..],
            &b"10 path=xy\n"[..],
            &b"x path=x\n"[..],
            &b"7 path\n"[..],
        ];
        for data in bad {
            let mut records = PaxRecords::new(data);
            assert!(records.next().unwrap().is_err(), "{:?}", data);
            assert!(records.next().is_none());
        }
    }
}
