use tempfile::tempdir;

use crate::{DumpReader, DumpWriter};

// -------------------- Exact bytes --------------------

#[test]
fn writes_the_cdbmake_grammar() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.dump");

    let mut w = DumpWriter::create(&path).unwrap();
    w.write(b"one", b"first").unwrap();
    w.write(b"", b"").unwrap();
    w.close().unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes, b"+3,5:one->first\n+0,0:->\n\n");
}

#[test]
fn empty_dump_is_a_single_newline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.dump");

    let mut w = DumpWriter::create(&path).unwrap();
    w.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"\n");
}

#[test]
fn binary_payloads_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("binary.dump");

    let key = b"k\r\n->".to_vec();
    let value = vec![0u8, 255, b'\n', b'+', 7];

    let mut w = DumpWriter::create(&path).unwrap();
    w.write(&key, &value).unwrap();
    w.write(b"plain", b"text").unwrap();
    w.close().unwrap();

    let records: Vec<_> = DumpReader::open(&path)
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(
        records,
        vec![(key, value), (b"plain".to_vec(), b"text".to_vec())]
    );
}

// -------------------- Atomic publish --------------------

#[test]
fn atomic_close_replaces_the_target() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("replace.dump");
    std::fs::write(&path, b"stale contents").unwrap();

    let mut w = DumpWriter::create_atomic(&path).unwrap();
    // target untouched while the writer is open
    assert_eq!(std::fs::read(&path).unwrap(), b"stale contents");
    w.write(b"k", b"v").unwrap();
    w.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"+1,1:k->v\n\n");
}

#[test]
fn atomic_drop_without_close_leaves_target_alone() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("abandoned.dump");

    {
        let mut w = DumpWriter::create_atomic(&path).unwrap();
        w.write(b"k", b"v").unwrap();
        // dropped unclosed
    }

    assert!(!path.exists());
}

// -------------------- Lifecycle --------------------

#[test]
fn close_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("twice.dump");

    let mut w = DumpWriter::create(&path).unwrap();
    w.write(b"a", b"b").unwrap();
    w.close().unwrap();
    w.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"+1,1:a->b\n\n");
}

#[test]
fn direct_drop_without_close_deletes_partial_output() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.dump");

    {
        let mut w = DumpWriter::create(&path).unwrap();
        w.write(b"a", b"b").unwrap();
        // dropped unclosed: the half-written file must not survive
    }

    assert!(!path.exists());
}

#[test]
fn write_after_close_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("closed.dump");

    let mut w = DumpWriter::create(&path).unwrap();
    w.close().unwrap();
    assert!(w.write(b"a", b"b").is_err());
}
