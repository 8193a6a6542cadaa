use crate::format::{read_pair, write_pair, MainTable, SlotTableInfo, MAIN_TABLE_SIZE};
use crate::hash::{hash, Key};

// -------------------- Hash --------------------

// Reference vectors; a deviation here makes every file unreadable by other
// cdb implementations.
#[test]
fn hash_matches_reference_vectors() {
    assert_eq!(hash(b""), 5381);
    assert_eq!(hash(b"single"), 2_172_526_655);
    assert_eq!(hash(b"multi"), 175_214_764);
    assert_eq!(hash(b"one"), 193_420_161);
}

#[test]
fn hash_zero_extends_high_bytes() {
    // 0xFF must enter the hash as 255, never sign-extended
    assert_eq!(hash(&[0xff]), (5381u32.wrapping_mul(33)) ^ 0xff);
}

#[test]
fn equal_bytes_equal_hashes() {
    let a = Key::new(b"identical");
    let b = Key::new(&b"identical".to_vec());
    assert_eq!(a.hash, b.hash);
}

#[test]
fn key_projections() {
    let key = Key::new(b"single");
    assert_eq!(key.hash, 2_172_526_655);
    assert_eq!(key.bucket(), 63);
    assert_eq!(key.probe(), 8_486_432);
}

// -------------------- Pair codec --------------------

#[test]
fn pair_codec_is_little_endian() {
    let mut buf = Vec::new();
    write_pair(&mut buf, 0x0102_0304, 0xaabb_ccdd).unwrap();
    assert_eq!(buf, [0x04, 0x03, 0x02, 0x01, 0xdd, 0xcc, 0xbb, 0xaa]);

    let decoded = read_pair(&mut &buf[..]).unwrap();
    assert_eq!(decoded, (0x0102_0304, 0xaabb_ccdd));
}

#[test]
fn read_pair_fails_short_input() {
    assert!(read_pair(&mut &[0u8; 7][..]).is_err());
}

// -------------------- Main table / slot table info --------------------

fn header_with_entry(bucket: usize, offset: u32, slots: u32) -> [u8; MAIN_TABLE_SIZE as usize] {
    let mut header = [0u8; MAIN_TABLE_SIZE as usize];
    write_pair(&mut &mut header[bucket * 8..bucket * 8 + 8], offset, slots).unwrap();
    header
}

#[test]
fn slot_table_info_for_populated_bucket() {
    let key = Key::new(b"single"); // bucket 63, probe 8486432
    let header = header_with_entry(63, 2073, 2);

    let info = SlotTableInfo::new(&MainTable::parse(&header), &key);
    assert!(info.has_slots());
    assert_eq!(info.offset, 2073);
    assert_eq!(info.slots, 2);
    assert_eq!(info.first_slot, 8_486_432 % 2);
    assert_eq!(info.slot_offset(0), 2073);
    assert_eq!(info.slot_offset(1), 2081);
}

#[test]
fn slot_table_info_for_empty_bucket() {
    let key = Key::new(b"single");
    let header = header_with_entry(0, 2048, 0);

    let info = SlotTableInfo::new(&MainTable::parse(&header), &key);
    assert!(!info.has_slots());
    assert_eq!(info.first_slot, 0);
}

#[test]
fn end_of_records_comes_from_entry_zero() {
    let header = header_with_entry(0, 3172, 8);
    assert_eq!(MainTable::parse(&header).end_of_records(), 3172);
}
