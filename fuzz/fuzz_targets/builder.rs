#![no_main]

use libfuzzer_sys::fuzz_target;

use std::io::Read;
use ustar::{Archive, Builder, NewEntry};

fuzz_target!(|data: &[u8]| {
    // Carve the input into entries: one length byte for the path, then one
    // for the payload.
    let mut files = Vec::new();
    let mut rest = data;
    while rest.len() >= 2 {
        let path_len = rest[0] as usize;
        let data_len = rest[1] as usize * 7;
        rest = &rest[2..];
        let path = String::from_utf8_lossy(&rest[..path_len.min(rest.len())]).into_owned();
        rest = &rest[path_len.min(rest.len())..];
        let payload = rest[..data_len.min(rest.len())].to_vec();
        rest = &rest[data_len.min(rest.len())..];
        files.push((path, payload));
    }

    let mut builder = Builder::new(Vec::new());
    let mut written = Vec::new();
    for (path, payload) in files {
        // Text fields are trimmed on read, so spaces don't survive.
        if path.chars().any(char::is_whitespace) {
            continue;
        }
        if builder.append_data(NewEntry::new(path.as_str()), &payload).is_ok() {
            written.push((path.strip_suffix('/').unwrap_or(&path).to_string(), payload));
        }
    }
    let archive = builder.into_inner().unwrap();
    assert_eq!(archive.len() % 512, 0);

    let mut archive = Archive::new(&archive[..]);
    let mut read = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let mut payload = Vec::new();
        entry.read_to_end(&mut payload).unwrap();
        read.push((entry.path().to_string(), payload));
    }
    assert_eq!(read, written);
});
