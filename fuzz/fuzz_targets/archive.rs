#![no_main]

use libfuzzer_sys::fuzz_target;

use std::io::Read;
use ustar::Archive;

fuzz_target!(|data: &[u8]| {
    // The first byte picks the read size so short and long reads both get
    // exercised against the same framing.
    let (chunk, data) = match data.split_first() {
        Some((b, rest)) => (*b as usize * 8 + 1, rest),
        None => return,
    };

    let mut archive = Archive::new(data);
    let entries = match archive.entries() {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let mut buf = vec![0; chunk];
    for entry in entries {
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(_) => break,
        };
        let size = entry.size();
        let mut total = 0u64;
        loop {
            match entry.read(&mut buf) {
                Ok(0) => {
                    assert_eq!(total, size);
                    break;
                }
                Ok(n) => total += n as u64,
                Err(_) => break,
            }
        }
    }
});
