use std::iter::repeat;

use filetime::FileTime;
use ustar::layout::{self, BLOCK_SIZE};
use ustar::{split_path, EntryType, Header, HeaderDefaults, NewEntry, TarError, TarErrorKind};

fn sample() -> Header {
    let mut h = Header::new("some/dir/file.txt", 1234);
    h.set_mode(0o755);
    h.set_uid(501);
    h.set_gid(20);
    h.set_mtime(FileTime::from_unix_time(1_700_000_000, 0));
    h.set_username("alice");
    h.set_groupname("staff");
    h
}

fn err_kind(r: std::io::Result<impl Sized>) -> Option<TarErrorKind> {
    match r {
        Ok(_) => panic!("expected an error"),
        Err(e) => TarError::kind_of(&e),
    }
}

#[test]
fn new_uses_writer_defaults() {
    let h = Header::new("a", 7);
    let entry = NewEntry::new("a").size(7).mtime(FileTime::zero());
    assert_eq!(t!(HeaderDefaults::default().apply(entry)), h);
}

#[test]
fn round_trip() {
    let h = sample();
    let block = t!(h.to_block());
    assert_eq!(t!(Header::from_block(&block)), Some(h));
}

#[test]
fn field_encoding() {
    let block = t!(sample().to_block());
    assert_eq!(layout::MODE.of(&block), b"0000755\0");
    assert_eq!(layout::UID.of(&block), b"0000765\0");
    assert_eq!(layout::SIZE.of(&block), b"00000002322\0");
    assert_eq!(layout::MAGIC.of(&block), b"ustar\0");
    assert_eq!(layout::VERSION.of(&block), b"00");
    assert_eq!(block[layout::TYPEFLAG.offset], b'0');
    assert_eq!(&layout::NAME.of(&block)[..18], b"some/dir/file.txt\0");
    assert!(layout::PREFIX.of(&block).iter().all(|b| *b == 0));

    let cksum = layout::CHECKSUM.of(&block);
    assert_eq!(cksum[6], 0);
    assert_eq!(cksum[7], b' ');
    let expected = block
        .iter()
        .enumerate()
        .map(|(i, b)| {
            if layout::CHECKSUM.range().contains(&i) {
                b' ' as u32
            } else {
                *b as u32
            }
        })
        .sum::<u32>();
    assert_eq!(
        std::str::from_utf8(&cksum[..6]).unwrap(),
        format!("{:06o}", expected)
    );
}

#[test]
fn mode_is_masked() {
    let mut h = Header::new("a", 0);
    h.set_mode(0o170644);
    let block = t!(h.to_block());
    assert_eq!(t!(Header::from_block(&block)).unwrap().mode(), 0o0644);
}

#[test]
fn every_byte_is_checked() {
    let block = t!(sample().to_block());
    let magic = layout::MAGIC.offset..layout::MAGIC.offset + layout::MAGIC_CHECKED;
    for i in 0..BLOCK_SIZE {
        let mut bad = block;
        bad[i] ^= 0x40;
        let res = Header::from_block(&bad);
        if magic.contains(&i) {
            // Without the magic the block reads as the end of the archive.
            assert!(t!(res).is_none(), "byte {}", i);
        } else if i == layout::CHECKSUM.offset + 7 {
            // Trails the nul that ends the checksum, never read.
            assert!(t!(res).is_some(), "byte {}", i);
        } else if layout::CHECKSUM.range().contains(&i) {
            assert!(res.is_err(), "byte {}", i);
        } else {
            assert_eq!(err_kind(res), Some(TarErrorKind::Format), "byte {}", i);
        }
    }
}

#[test]
fn blank_checksum() {
    let mut block = t!(sample().to_block());
    layout::CHECKSUM.of_mut(&mut block).copy_from_slice(b"        ");
    assert_eq!(err_kind(Header::from_block(&block)), Some(TarErrorKind::Format));

    // Blank everywhere else too: still a header, and still nothing to match.
    let mut block = [0; BLOCK_SIZE];
    layout::MAGIC.of_mut(&mut block).copy_from_slice(layout::USTAR_MAGIC);
    layout::CHECKSUM.of_mut(&mut block).copy_from_slice(b"        ");
    assert_eq!(err_kind(Header::from_block(&block)), Some(TarErrorKind::Format));
}

#[test]
fn wrong_length() {
    let block = t!(sample().to_block());
    assert_eq!(err_kind(Header::from_block(&block[..511])), Some(TarErrorKind::Format));
    let mut long = block.to_vec();
    long.push(0);
    assert_eq!(err_kind(Header::from_block(&long)), Some(TarErrorKind::Format));
}

#[test]
fn zero_block() {
    assert!(t!(Header::from_block(&[0; BLOCK_SIZE])).is_none());
}

#[test]
fn nul_type_flag_is_regular() {
    let mut h = Header::new("old", 0);
    h.set_entry_type(EntryType::Regular);
    let mut block = t!(h.to_block());
    block[layout::TYPEFLAG.offset] = 0;
    fix_checksum(&mut block);
    let h = t!(Header::from_block(&block)).unwrap();
    assert_eq!(h.entry_type(), EntryType::Regular);
}

#[test]
fn unknown_type_flag() {
    let mut block = t!(Header::new("odd", 0).to_block());
    block[layout::TYPEFLAG.offset] = b'Z';
    fix_checksum(&mut block);
    assert_eq!(err_kind(Header::from_block(&block)), Some(TarErrorKind::Format));
}

#[test]
fn old_gnu_magic() {
    let mut block = t!(sample().to_block());
    block[layout::MAGIC.offset..layout::MAGIC.offset + 8].copy_from_slice(b"ustar  \0");
    fix_checksum(&mut block);
    assert_eq!(t!(Header::from_block(&block)).unwrap().path(), "some/dir/file.txt");
}

#[test]
fn blank_numeric_fields() {
    let mut block = t!(sample().to_block());
    for b in layout::UID.of_mut(&mut block) {
        *b = 0;
    }
    layout::GID.of_mut(&mut block).copy_from_slice(b"    24 \0");
    fix_checksum(&mut block);
    let h = t!(Header::from_block(&block)).unwrap();
    assert_eq!(h.uid(), 0);
    assert_eq!(h.gid(), 0o24);
}

#[test]
fn text_fields_are_trimmed() {
    let mut block = t!(sample().to_block());
    let uname = layout::UNAME.of_mut(&mut block);
    uname.fill(0);
    uname[..8].copy_from_slice(b"  bob \0x");
    fix_checksum(&mut block);
    assert_eq!(t!(Header::from_block(&block)).unwrap().username(), "bob");
}

#[test]
fn bad_octal() {
    let mut block = t!(sample().to_block());
    layout::SIZE.of_mut(&mut block).copy_from_slice(b"0000000009x\0");
    fix_checksum(&mut block);
    assert_eq!(err_kind(Header::from_block(&block)), Some(TarErrorKind::Format));
}

#[test]
fn field_overflow() {
    let mut h = Header::new("a", 0);
    h.set_uid(0o7777777);
    t!(h.to_block());
    h.set_uid(0o10000000);
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::InvalidField));

    let mut h = Header::new("a", 0o77777777777);
    t!(h.to_block());
    h.set_size(0o100000000000);
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::InvalidField));

    let mut h = Header::new("a", 0);
    h.set_username(repeat("u").take(33).collect::<String>());
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::InvalidField));
    h.set_username(repeat("u").take(32).collect::<String>());
    let block = t!(h.to_block());
    assert_eq!(t!(Header::from_block(&block)).unwrap().username().len(), 32);

    let mut h = Header::new("a", 0);
    h.set_link_name("nul\0inside");
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::InvalidField));

    let mut h = Header::new("a", 0);
    h.set_mtime(FileTime::from_unix_time(-1, 0));
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::InvalidField));
}

#[test]
fn split_short_paths() {
    assert_eq!(t!(split_path("file")), ("file", ""));
    assert_eq!(t!(split_path("dir/")), ("dir", ""));
    let hundred = repeat("x").take(100).collect::<String>();
    assert_eq!(t!(split_path(&hundred)), (hundred.as_str(), ""));
    let with_slash = hundred.clone() + "/";
    assert_eq!(t!(split_path(&with_slash)), (hundred.as_str(), ""));
}

#[test]
fn split_long_paths() {
    let prefix = repeat("p").take(155).collect::<String>();
    let name = repeat("n").take(99).collect::<String>();
    let path = format!("{}/{}", prefix, name);
    assert_eq!(path.len(), 255);
    assert_eq!(t!(split_path(&path)), (name.as_str(), prefix.as_str()));

    let mut h = Header::new(path.as_str(), 0);
    let block = t!(h.to_block());
    assert_eq!(t!(Header::from_block(&block)).unwrap().path(), path);

    // The last usable `/` is the one that keeps the prefix within bounds.
    let path = "a/b/".to_string() + &repeat("c").take(100).collect::<String>();
    assert_eq!(t!(split_path(&path)).1, "a/b");

    h.set_path(format!("{}x", path));
    assert_eq!(err_kind(h.to_block()), Some(TarErrorKind::NameTooLong));
}

#[test]
fn split_rejects() {
    let no_slash = repeat("x").take(101).collect::<String>();
    assert_eq!(err_kind(split_path(&no_slash)), Some(TarErrorKind::NameTooLong));

    let too_long = format!(
        "{}/{}",
        repeat("p").take(155).collect::<String>(),
        repeat("n").take(100).collect::<String>()
    );
    assert_eq!(too_long.len(), 256);
    assert_eq!(err_kind(split_path(&too_long)), Some(TarErrorKind::NameTooLong));

    // Prefix would need more than 155 bytes.
    let deep = format!(
        "{}/{}",
        repeat("p").take(156).collect::<String>(),
        repeat("n").take(10).collect::<String>()
    );
    assert_eq!(err_kind(split_path(&deep)), Some(TarErrorKind::NameTooLong));

    // Name would need more than 100 bytes.
    let wide = format!("a/{}", repeat("n").take(101).collect::<String>());
    assert_eq!(err_kind(split_path(&wide)), Some(TarErrorKind::NameTooLong));

    // A leading `/` can't be the split point.
    let rooted = format!("/{}", repeat("n").take(100).collect::<String>());
    assert_eq!(err_kind(split_path(&rooted)), Some(TarErrorKind::NameTooLong));
}

fn fix_checksum(block: &mut [u8; BLOCK_SIZE]) {
    for b in layout::CHECKSUM.of_mut(block) {
        *b = b' ';
    }
    let sum = block.iter().map(|b| *b as u32).sum::<u32>();
    let cksum = format!("{:06o}\0 ", sum);
    layout::CHECKSUM.of_mut(block).copy_from_slice(cksum.as_bytes());
}
