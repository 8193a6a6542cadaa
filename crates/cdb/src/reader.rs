use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{CdbError, Result};
use crate::format::{self, MainTable, SlotTableInfo, MAIN_TABLE_SIZE, MAX_DATA_LENGTH, MAX_OFFSET};
use crate::hash::Key;

/// Reads a constant database for point lookups and full iteration.
///
/// On [`open`](Cdb::open) the 2048-byte main table is loaded into memory, so
/// a lookup touches the file only for sub-table slots and record bytes.
///
/// A persistent file handle is kept open for the lifetime of the reader,
/// wrapped in a `Mutex` so that lookups can be called through a shared
/// `&self` reference from any number of threads. Each iterator carries its
/// own cursor; the lock serializes the seek+read sequences that share the
/// handle.
///
/// [`close`](Cdb::close) releases the handle; it is idempotent, and
/// operations after it fail with [`CdbError::State`].
#[derive(Debug)]
pub struct Cdb {
    /// Path to the file on disk (kept for diagnostics).
    #[allow(dead_code)]
    path: PathBuf,
    /// Parsed main table: 256 × (sub-table offset, sub-table slots).
    main_table: MainTable,
    /// Total file length, used to bound every read.
    size: u64,
    /// Persistent file handle; `None` once closed.
    file: Mutex<Option<File>>,
}

impl Cdb {
    /// Opens a cdb file and loads its main table.
    ///
    /// # Validation
    ///
    /// - The file must be at least 2048 bytes (the main table); shorter
    ///   files, zero-byte files included, fail with [`CdbError::Format`].
    /// - The file must not exceed 4 GiB, the largest size 32-bit offsets can
    ///   address.
    ///
    /// # Errors
    ///
    /// Returns [`CdbError::Io`] if the file cannot be opened or read,
    /// [`CdbError::Format`] if it cannot be a cdb file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let size = file.metadata()?.len();

        if size < MAIN_TABLE_SIZE {
            return Err(CdbError::Format(format!(
                "cdb file too small: {} bytes",
                size
            )));
        }
        if size > MAX_OFFSET + 1 {
            return Err(CdbError::Format(format!(
                "cdb file too large: {} bytes",
                size
            )));
        }

        let mut header = [0u8; MAIN_TABLE_SIZE as usize];
        file.read_exact(&mut header)?;

        Ok(Cdb {
            path,
            main_table: MainTable::parse(&header),
            size,
            file: Mutex::new(Some(file)),
        })
    }

    /// Returns the first value stored under `key`, or `None`.
    pub fn find_one(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.iter_key(key).next().transpose()
    }

    /// Returns every value stored under `key`, in the order the records were
    /// added when the database was built.
    pub fn find_all(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        self.iter_key(key).collect()
    }

    /// Streams the values stored under `key` without materializing them all.
    ///
    /// Probing is deterministic, so values come back in insertion order.
    /// Slots whose hash matches but whose stored key differs (32-bit hash
    /// collisions) are skipped.
    pub fn iter_key(&self, key: &[u8]) -> KeyIter<'_> {
        let key = Key::new(key);
        let info = SlotTableInfo::new(&self.main_table, &key);
        KeyIter {
            cdb: self,
            slot: info.first_slot,
            examined: 0,
            done: !info.has_slots(),
            key,
            info,
        }
    }

    /// Iterates every `(key, value)` record in insertion order.
    ///
    /// The records region ends where the first sub-table begins, which is
    /// exactly the offset stored in main-table entry 0.
    pub fn iter(&self) -> CdbIter<'_> {
        CdbIter {
            cdb: self,
            pos: MAIN_TABLE_SIZE,
            end: self.main_table.end_of_records(),
        }
    }

    /// Closes the database. Idempotent; concurrent lookups finish first, and
    /// later operations fail with [`CdbError::State`].
    pub fn close(&self) {
        match self.file.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, Option<File>>> {
        self.file
            .lock()
            .map_err(|_| CdbError::State("cdb file lock poisoned".to_string()))
    }

    fn read_at(&self, file: &mut File, buf: &mut [u8], pos: u64) -> Result<()> {
        if pos + buf.len() as u64 > self.size {
            return Err(CdbError::Format(format!(
                "read of {} bytes at offset {} runs past end of file",
                buf.len(),
                pos
            )));
        }
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn read_pair_at(&self, file: &mut File, pos: u64) -> Result<(u32, u32)> {
        let mut buf = [0u8; 8];
        self.read_at(file, &mut buf, pos)?;
        Ok(format::read_pair(&mut &buf[..])?)
    }

    /// Reads the record at `offset` and returns its value if the stored key
    /// equals `key`; `None` on a hash collision with a different key.
    fn read_record_value(
        &self,
        file: &mut File,
        key: &Key,
        offset: u64,
    ) -> Result<Option<Vec<u8>>> {
        let (klen, dlen) = self.read_pair_at(file, offset)?;
        if dlen > MAX_DATA_LENGTH {
            return Err(CdbError::Format(format!(
                "record data length {} exceeds maximum",
                dlen
            )));
        }
        if klen as usize != key.bytes.len() {
            return Ok(None);
        }

        let mut stored_key = vec![0u8; klen as usize];
        self.read_at(file, &mut stored_key, offset + 8)?;
        if stored_key != key.bytes {
            return Ok(None);
        }

        let mut value = vec![0u8; dlen as usize];
        self.read_at(file, &mut value, offset + 8 + u64::from(klen))?;
        Ok(Some(value))
    }
}

/// Iterator over the values stored under one key.
pub struct KeyIter<'a> {
    cdb: &'a Cdb,
    key: Key,
    info: SlotTableInfo,
    /// Next slot index to probe.
    slot: u32,
    /// Slots examined so far; probing stops after one full sweep.
    examined: u32,
    done: bool,
}

impl KeyIter<'_> {
    /// Probes forward until the next record whose stored key matches, an
    /// empty slot, or the end of the sweep. The whole sequence runs under
    /// one acquisition of the file lock.
    fn advance(&mut self) -> Result<Option<Vec<u8>>> {
        let mut guard = self.cdb.guard()?;
        let file = guard
            .as_mut()
            .ok_or_else(|| CdbError::State("cdb is closed".to_string()))?;

        while self.examined < self.info.slots {
            let slot_pos = self.info.slot_offset(self.slot);
            let (slot_hash, record_offset) = self.cdb.read_pair_at(file, slot_pos)?;

            self.examined += 1;
            self.slot += 1;
            if self.slot == self.info.slots {
                self.slot = 0;
            }

            // An empty slot ends the probe chain. The record offset alone is
            // the sentinel: offset 0 is inside the main table, so no real
            // record can live there, while a stored hash of 0 is legitimate.
            if record_offset == 0 {
                return Ok(None);
            }
            if slot_hash != self.key.hash {
                continue;
            }
            if let Some(value) =
                self.cdb
                    .read_record_value(file, &self.key, u64::from(record_offset))?
            {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

impl Iterator for KeyIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Iterator over every record in the database, in insertion order.
pub struct CdbIter<'a> {
    cdb: &'a Cdb,
    /// Absolute offset of the next record.
    pos: u64,
    /// End of the records region.
    end: u64,
}

impl CdbIter<'_> {
    fn read_next(&mut self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut guard = self.cdb.guard()?;
        let file = guard
            .as_mut()
            .ok_or_else(|| CdbError::State("cdb is closed".to_string()))?;

        let (klen, dlen) = self.cdb.read_pair_at(file, self.pos)?;
        if klen > MAX_DATA_LENGTH || dlen > MAX_DATA_LENGTH {
            return Err(CdbError::Format(format!(
                "record length ({}, {}) exceeds maximum",
                klen, dlen
            )));
        }

        let mut key = vec![0u8; klen as usize];
        self.cdb.read_at(file, &mut key, self.pos + 8)?;
        let mut value = vec![0u8; dlen as usize];
        self.cdb
            .read_at(file, &mut value, self.pos + 8 + u64::from(klen))?;

        self.pos += 8 + u64::from(klen) + u64::from(dlen);
        Ok((key, value))
    }
}

impl Iterator for CdbIter<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        match self.read_next() {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }
}
