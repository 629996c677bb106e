#![cfg(feature = "async")]

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use ustar::aio::{AsyncArchive, AsyncBuilder};
use ustar::{Archive, Builder, NewEntry, TarError, TarErrorKind, BLOCK_SIZE};

macro_rules! t {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => panic!("{} returned {}", stringify!($e), e),
        }
    };
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[tokio::test]
async fn round_trip() {
    let sizes = [0, 1, 511, 512, 513, 1536];
    let mut ar = AsyncBuilder::new(Vec::new());
    for &len in &sizes {
        t!(ar.append_data(NewEntry::new(format!("f{}", len)), &payload(len)).await);
    }
    let data = t!(ar.into_inner().await);

    // Byte-identical to the blocking writer given the same headers.
    let mut sync = Builder::new(Vec::new());
    let mut ar = AsyncArchive::new(&data[..]);
    let mut seen = Vec::new();
    while let Some(mut entry) = t!(ar.next_entry().await) {
        let mut v = Vec::new();
        t!(entry.read_to_end(&mut v).await);
        assert_eq!(v, payload(entry.size() as usize));
        t!(sync.append_data(NewEntry::from(entry.header().clone()), &v));
        seen.push(entry.path().to_string());
    }
    assert_eq!(seen, ["f0", "f1", "f511", "f512", "f513", "f1536"]);
    assert_eq!(t!(sync.into_inner()), data);
}

#[tokio::test]
async fn chunks_and_skips() {
    let mut ar = AsyncBuilder::new(Vec::new());
    t!(ar.append_data(NewEntry::new("a"), &payload(3000)).await);
    t!(ar.append_str(NewEntry::new("b"), "skipped").await);
    t!(ar.append_str(NewEntry::new("c"), "cancelled").await);
    t!(ar.append_str(NewEntry::new("d"), "last").await);
    let data = t!(ar.into_inner().await);

    let mut ar = AsyncArchive::new(&data[..]);

    let mut a = t!(ar.next_entry().await).unwrap();
    let mut got = Vec::new();
    while let Some(chunk) = t!(a.next_chunk(1000).await) {
        assert!(chunk.len() <= 1000);
        got.extend_from_slice(&chunk);
    }
    assert_eq!(got, payload(3000));
    assert_eq!(a.remaining(), 0);

    let b = t!(ar.next_entry().await).unwrap();
    assert_eq!(b.path(), "b");

    let mut c = t!(ar.next_entry().await).unwrap();
    let mut buf = [0; 3];
    t!(c.read_exact(&mut buf).await);
    assert_eq!(&buf, b"can");
    t!(c.cancel().await);

    let mut d = t!(ar.next_entry().await).unwrap();
    let mut s = String::new();
    t!(d.read_to_string(&mut s).await);
    assert_eq!(s, "last");

    assert!(t!(ar.next_entry().await).is_none());
    assert!(t!(ar.next_entry().await).is_none());
    assert!(ar.into_inner().is_empty());
}

#[tokio::test]
async fn reads_blocking_output() {
    let mut ar = Builder::new(Vec::new());
    t!(ar.append_data(NewEntry::new("x/y"), &payload(777)));
    let data = t!(ar.into_inner());

    let mut ar = AsyncArchive::new(&data[..]);
    let mut e = t!(ar.next_entry().await).unwrap();
    let mut buf = vec![0; 800];
    let n = t!(e.read(&mut buf).await);
    assert_eq!(&buf[..n], &payload(777)[..]);
    assert_eq!(t!(e.read(&mut buf).await), 0);

    // The end-of-archive marker hasn't been reached yet.
    let rest = ar.into_inner();
    assert_eq!(rest, &[0; 2 * BLOCK_SIZE][..]);
}

#[tokio::test]
async fn truncated() {
    let mut ar = AsyncBuilder::new(Vec::new());
    t!(ar.append_data(NewEntry::new("a"), &payload(2000)).await);
    let mut data = t!(ar.into_inner().await);
    data.truncate(BLOCK_SIZE + 1000);

    let mut ar = AsyncArchive::new(&data[..]);
    let mut e = t!(ar.next_entry().await).unwrap();
    let mut v = Vec::new();
    let err = e.read_to_end(&mut v).await.err().unwrap();
    assert_eq!(TarError::kind_of(&err), Some(TarErrorKind::UnexpectedEof));

    let mut ar = AsyncArchive::new(&data[..]);
    drop(t!(ar.next_entry().await));
    let err = ar.next_entry().await.err().unwrap();
    assert_eq!(TarError::kind_of(&err), Some(TarErrorKind::UnexpectedEof));
    assert!(t!(ar.next_entry().await).is_none());
}

#[tokio::test]
async fn unfinished_writer_is_misuse() {
    let mut ar = AsyncBuilder::new(Vec::new());
    {
        let mut w = t!(ar.open(NewEntry::new("a").size(2)).await);
        t!(w.write_all(b"ab").await);
        assert_eq!(w.written(), 2);
    }
    let err = ar.open(NewEntry::new("b").size(0)).await.err().unwrap();
    assert_eq!(TarError::kind_of(&err), Some(TarErrorKind::Misuse));
    let err = ar.finish().await.err().unwrap();
    assert_eq!(err.kind(), io::ErrorKind::Other);
}

#[tokio::test]
async fn append_reader() {
    let contents = payload(1234);
    let mut ar = AsyncBuilder::new(Vec::new());
    let n = t!(ar.append_reader(NewEntry::new("r").size(1234), &contents[..]).await);
    assert_eq!(n, 1234);
    let err = ar.open(NewEntry::new("no-size")).await.err().unwrap();
    assert_eq!(TarError::kind_of(&err), Some(TarErrorKind::InvalidField));
    let data = t!(ar.into_inner().await);

    let mut ar = Archive::new(&data[..]);
    let mut entries = t!(ar.entries());
    let mut e = t!(entries.next().unwrap());
    let mut v = Vec::new();
    t!(std::io::Read::read_to_end(&mut e, &mut v));
    assert_eq!(v, contents);
}

#[tokio::test]
async fn shutdown_closes_entry() {
    let mut ar = AsyncBuilder::new(Vec::new());
    {
        let mut w = t!(ar.open(NewEntry::new("a").size(3)).await);
        t!(w.write_all(b"abc").await);
        t!(w.shutdown().await);
        t!(w.shutdown().await);
        let err = w.write(b"d").await.err().unwrap();
        assert_eq!(TarError::kind_of(&err), Some(TarErrorKind::Misuse));
    }
    t!(ar.append_str(NewEntry::new("b"), "b").await);
    let data = t!(ar.into_inner().await);
    assert_eq!(data.len(), 4 * BLOCK_SIZE + 1024);

    let mut ar = AsyncArchive::new(&data[..]);
    let mut read = Vec::new();
    while let Some(mut entry) = t!(ar.next_entry().await) {
        let mut v = Vec::new();
        t!(entry.read_to_end(&mut v).await);
        read.push((entry.path().to_string(), v));
    }
    assert_eq!(
        read,
        [("a".to_string(), b"abc".to_vec()), ("b".to_string(), b"b".to_vec())]
    );
}
