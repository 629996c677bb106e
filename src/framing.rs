//! Block framing shared by the sync and async frontends.
//!
//! Nothing here performs I/O. The frontends ask how many bytes to read next,
//! read them however they read, and report back how many arrived.

use std::cmp;

use crate::layout::BLOCK_SIZE;

/// Returns the number of zero bytes that follow a payload of `size` bytes so
/// the next header starts on a block boundary.
///
/// Always in `0..512`.
pub fn padding_for(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    (block - size % block) % block
}

/// Bytes still owed by the entry under the cursor.
///
/// The default value is the inert state: nothing remaining, nothing to pad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Framing {
    remaining: u64,
    pad: u64,
    cancelled: bool,
}

impl Framing {
    pub(crate) fn new(size: u64) -> Framing {
        Framing {
            remaining: size,
            pad: padding_for(size),
            cancelled: false,
        }
    }

    /// Payload bytes not yet handed to the consumer.
    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Payload plus padding still to be read from the underlying stream.
    pub(crate) fn owed(&self) -> u64 {
        self.remaining + self.pad
    }

    pub(crate) fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether the next pull should discard the rest instead of delivering
    /// payload.
    pub(crate) fn is_draining(&self) -> bool {
        self.remaining == 0 || self.cancelled
    }

    /// How many bytes to read from the underlying stream for a consumer
    /// asking for `want` bytes. May reach into the padding.
    pub(crate) fn request(&self, want: usize) -> usize {
        cmp::min(want as u64, self.owed()) as usize
    }

    /// Records `n` bytes read from the underlying stream and returns how many
    /// of them are payload; the rest were padding.
    pub(crate) fn consume(&mut self, n: usize) -> usize {
        let n = n as u64;
        debug_assert!(n <= self.owed(), "read past the end of the entry");
        let payload = cmp::min(n, self.remaining);
        self.remaining -= payload;
        self.pad -= cmp::min(n - payload, self.pad);
        payload as usize
    }
}

/// Padding to write after an entry whose sink saw `written` bytes.
///
/// The header already promised `declared` bytes; a mismatch leaves a corrupt
/// archive behind, which is logged but not prevented.
pub(crate) fn closing_padding(path: &str, declared: u64, written: u64) -> usize {
    if written != declared {
        tracing::warn!(
            path,
            declared,
            written,
            "entry closed with a different byte count than its header declares"
        );
    }
    padding_for(written) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(1), 511);
        assert_eq!(padding_for(511), 1);
        assert_eq!(padding_for(512), 0);
        assert_eq!(padding_for(513), 511);
        assert_eq!(padding_for(1536), 0);
    }

    #[test]
    fn consume_spills_into_padding() {
        let mut f = Framing::new(2);
        assert_eq!(f.owed(), 512);
        assert_eq!(f.request(800), 512);
        assert_eq!(f.consume(100), 2);
        assert_eq!(f.remaining(), 0);
        assert_eq!(f.owed(), 412);
        assert!(f.is_draining());
        assert_eq!(f.consume(412), 0);
        assert_eq!(f, Framing { remaining: 0, pad: 0, cancelled: false });
    }

    #[test]
    fn partial_reads() {
        let mut f = Framing::new(600);
        assert_eq!(f.request(300), 300);
        assert_eq!(f.consume(300), 300);
        assert_eq!(f.consume(299), 299);
        assert!(!f.is_draining());
        assert_eq!(f.consume(1), 1);
        assert!(f.is_draining());
        assert_eq!(f.owed(), 424);
    }

    #[test]
    fn cancel_drains_everything() {
        let mut f = Framing::new(10);
        f.consume(3);
        f.cancel();
        assert!(f.is_draining());
        assert_eq!(f.owed(), 509);
    }

    #[test]
    fn inert() {
        let f = Framing::default();
        assert!(f.is_draining());
        assert_eq!(f.owed(), 0);
        assert_eq!(f.request(4096), 0);
    }
}
