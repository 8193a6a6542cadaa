//! Layout constants and the little-endian primitives every other module is
//! built from: the u32-pair codec, the parsed main table, and the per-key
//! slot-table lookup.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result as IoResult, Write};

use crate::hash::Key;

/// Size of the main table: 256 entries × (4 bytes + 4 bytes).
pub const MAIN_TABLE_SIZE: u64 = 2048;

/// Number of entries in the main table.
pub const MAIN_TABLE_ENTRIES: usize = 256;

/// Maximum permitted length for a single key or value (~256 MiB).
///
/// Every offset in the file must fit in 32 bits, main table and sub-tables
/// included; capping each field well below 4 GiB keeps a single oversized
/// record from ever getting close.
pub const MAX_DATA_LENGTH: u32 = 0x0fff_ffff;

/// Largest representable file offset; the file as a whole must stay within
/// `MAX_OFFSET + 1` bytes.
pub const MAX_OFFSET: u64 = 0xffff_ffff;

/// Writes `first` then `second` as little-endian u32.
pub fn write_pair<W: Write>(w: &mut W, first: u32, second: u32) -> IoResult<()> {
    w.write_u32::<LittleEndian>(first)?;
    w.write_u32::<LittleEndian>(second)?;
    Ok(())
}

/// Reads a little-endian u32 pair; fails if fewer than 8 bytes are available.
pub fn read_pair<R: Read>(r: &mut R) -> IoResult<(u32, u32)> {
    let first = r.read_u32::<LittleEndian>()?;
    let second = r.read_u32::<LittleEndian>()?;
    Ok((first, second))
}

/// The 256 main-table entries from the head of a cdb file, parsed once at
/// open so lookups never re-read the header.
///
/// Entry `i` holds `(sub_table_offset, sub_table_slots)` for every record
/// whose key hash is `i` modulo 256; `slots == 0` means the bucket is empty.
/// Entry 0's offset doubles as the end of the records region, since the
/// sub-tables start where the records stop.
#[derive(Debug, Clone)]
pub struct MainTable {
    entries: [(u32, u32); MAIN_TABLE_ENTRIES],
}

impl MainTable {
    /// Parses the 2048 header bytes.
    pub fn parse(header: &[u8; MAIN_TABLE_SIZE as usize]) -> Self {
        let mut entries = [(0u32, 0u32); MAIN_TABLE_ENTRIES];
        for (i, entry) in entries.iter_mut().enumerate() {
            let mut chunk = &header[i * 8..i * 8 + 8];
            // reading from an in-bounds slice cannot fail
            *entry = read_pair(&mut chunk).unwrap_or((0, 0));
        }
        MainTable { entries }
    }

    /// `(sub_table_offset, sub_table_slots)` for `bucket`.
    #[must_use]
    pub fn entry(&self, bucket: usize) -> (u32, u32) {
        self.entries[bucket]
    }

    /// Absolute offset where the records region ends and the sub-tables
    /// begin.
    #[must_use]
    pub fn end_of_records(&self) -> u64 {
        u64::from(self.entries[0].0)
    }
}

/// Where lookup for one key starts: its bucket's sub-table offset and slot
/// count, plus the initial probe slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotTableInfo {
    pub offset: u32,
    pub slots: u32,
    pub first_slot: u32,
}

impl SlotTableInfo {
    pub fn new(table: &MainTable, key: &Key) -> Self {
        let (offset, slots) = table.entry(key.bucket());
        let first_slot = if slots > 0 { key.probe() % slots } else { 0 };
        SlotTableInfo {
            offset,
            slots,
            first_slot,
        }
    }

    #[must_use]
    pub fn has_slots(&self) -> bool {
        self.slots != 0
    }

    /// Absolute file offset of slot `index`.
    #[must_use]
    pub fn slot_offset(&self, index: u32) -> u64 {
        u64::from(self.offset) + (u64::from(index) << 3)
    }
}
