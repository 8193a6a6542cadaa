use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{CdbError, Result};
use crate::format::{self, MAIN_TABLE_SIZE, MAX_DATA_LENGTH, MAX_OFFSET};
use crate::hash::hash;

/// One record's slot-table entry, accumulated while records stream out.
#[derive(Debug, Clone, Copy)]
struct HashPos {
    hash: u32,
    pos: u32,
}

/// Streams records into a new constant database.
///
/// Construction writes a 2048-byte zero header and positions the cursor at
/// the records region. [`add`](CdbWriter::add) appends one record and files
/// its `(hash, offset)` entry under the right bucket.
/// [`close`](CdbWriter::close) emits the 256 sub-tables at the tail,
/// rewrites the header, flushes durably, and — in atomic mode — renames the
/// temp file over the target.
///
/// Any failure deletes the file being written, so a partial database is
/// never left behind; dropping an unclosed writer does the same.
pub struct CdbWriter {
    file: Option<BufWriter<File>>,
    target: PathBuf,
    /// `Some` in atomic mode: the path actually being written, renamed to
    /// `target` on close.
    tmp: Option<PathBuf>,
    /// Offset of the next record; starts at 2048.
    pos: u64,
    /// Per-bucket `(hash, offset)` lists in insertion order.
    buckets: Vec<Vec<HashPos>>,
}

impl CdbWriter {
    /// Opens `path` for writing directly. If `close` fails the file is
    /// deleted; prefer [`create_atomic`](CdbWriter::create_atomic) when the
    /// target may already have readers.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path.as_ref().to_path_buf(), None)
    }

    /// Writes `tmp-<basename>` in the system temp directory and renames it
    /// over `path` on close.
    ///
    /// The rename is atomic only within one filesystem; if the temp
    /// directory lives elsewhere the rename fails, the temp file is removed,
    /// and the target is left as it was.
    pub fn create_atomic<P: AsRef<Path>>(path: P) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        let tmp = default_tmp_path(&target)?;
        Self::open(target, Some(tmp))
    }

    /// Like [`create_atomic`](CdbWriter::create_atomic) with an explicit
    /// temp path.
    pub fn with_tmp_path<P: AsRef<Path>, Q: AsRef<Path>>(target: P, tmp: Q) -> Result<Self> {
        Self::open(target.as_ref().to_path_buf(), Some(tmp.as_ref().to_path_buf()))
    }

    fn open(target: PathBuf, tmp: Option<PathBuf>) -> Result<Self> {
        let path = tmp.as_deref().unwrap_or(&target);
        let file = File::create(path)?;
        let mut writer = CdbWriter {
            file: Some(BufWriter::new(file)),
            target,
            tmp,
            pos: MAIN_TABLE_SIZE,
            buckets: vec![Vec::new(); format::MAIN_TABLE_ENTRIES],
        };
        if let Err(e) = writer.write_zero_header() {
            writer.discard();
            return Err(e);
        }
        Ok(writer)
    }

    fn write_zero_header(&mut self) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(writer_closed)?;
        file.write_all(&[0u8; MAIN_TABLE_SIZE as usize])?;
        Ok(())
    }

    /// Appends one record.
    ///
    /// # Errors
    ///
    /// [`CdbError::Format`] if key or value exceeds
    /// [`MAX_DATA_LENGTH`](format::MAX_DATA_LENGTH) or the record's offset
    /// no longer fits in 32 bits; [`CdbError::Io`] on write failure;
    /// [`CdbError::State`] after close. Except for the closed case, the
    /// output file is deleted before the error returns.
    pub fn add(&mut self, key: &[u8], data: &[u8]) -> Result<()> {
        if self.file.is_none() {
            return Err(writer_closed());
        }
        let result = self.add_inner(key, data);
        if result.is_err() {
            self.discard();
        }
        result
    }

    fn add_inner(&mut self, key: &[u8], data: &[u8]) -> Result<()> {
        if key.len() as u64 > u64::from(MAX_DATA_LENGTH)
            || data.len() as u64 > u64::from(MAX_DATA_LENGTH)
        {
            return Err(CdbError::Format(format!(
                "key or data too large: ({}, {}) bytes",
                key.len(),
                data.len()
            )));
        }
        if self.pos > MAX_OFFSET {
            return Err(CdbError::Format("cdb file too large".to_string()));
        }

        let file = self.file.as_mut().ok_or_else(writer_closed)?;
        format::write_pair(file, key.len() as u32, data.len() as u32)?;
        file.write_all(key)?;
        file.write_all(data)?;

        let key_hash = hash(key);
        self.buckets[(key_hash & 0xff) as usize].push(HashPos {
            hash: key_hash,
            pos: self.pos as u32,
        });
        self.pos += 8 + key.len() as u64 + data.len() as u64;
        Ok(())
    }

    /// Finalizes the database: sub-tables, header, durable flush, and — in
    /// atomic mode — the rename. Idempotent.
    ///
    /// On failure the output file (temp or direct target) is deleted and the
    /// error surfaces; an existing target is never left half-written.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        if let Err(e) = Self::write_tables(&mut file, &self.buckets, self.pos) {
            drop(file);
            let _ = fs::remove_file(self.written_path());
            return Err(e);
        }
        drop(file);

        if let Some(tmp) = &self.tmp {
            if let Err(e) = fs::rename(tmp, &self.target) {
                let _ = fs::remove_file(tmp);
                return Err(CdbError::Io(e));
            }
        }
        Ok(())
    }

    /// Emits the 256 sub-tables after the records region and rewrites the
    /// header with each bucket's `(offset, capacity)`.
    ///
    /// Each sub-table is composed in memory — capacity `2n`, every record
    /// placed by linear probing from `(hash div 256) mod capacity` in
    /// insertion order — and written with a single call.
    fn write_tables(
        file: &mut BufWriter<File>,
        buckets: &[Vec<HashPos>],
        records_end: u64,
    ) -> Result<()> {
        let mut header = [0u8; MAIN_TABLE_SIZE as usize];
        let mut table_start = records_end;

        for (i, bucket) in buckets.iter().enumerate() {
            if table_start > MAX_OFFSET {
                return Err(CdbError::Format("cdb file too large".to_string()));
            }
            let slots = bucket.len() * 2;
            format::write_pair(
                &mut &mut header[i * 8..i * 8 + 8],
                table_start as u32,
                slots as u32,
            )?;
            if bucket.is_empty() {
                continue;
            }

            let mut table = vec![HashPos { hash: 0, pos: 0 }; slots];
            for entry in bucket {
                let mut slot = (entry.hash >> 8) as usize % slots;
                while table[slot].pos != 0 {
                    slot += 1;
                    if slot == slots {
                        slot = 0;
                    }
                }
                table[slot] = *entry;
            }

            let mut buf = Vec::with_capacity(slots * 8);
            for slot in &table {
                format::write_pair(&mut buf, slot.hash, slot.pos)?;
            }
            file.write_all(&buf)?;
            table_start += slots as u64 * 8;
        }

        if table_start > MAX_OFFSET + 1 {
            return Err(CdbError::Format("cdb file too large".to_string()));
        }

        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header)?;
        file.flush()?;
        file.get_ref().sync_all()?;
        Ok(())
    }

    /// The path currently being written: the temp file in atomic mode, the
    /// target itself in direct mode.
    fn written_path(&self) -> &Path {
        self.tmp.as_deref().unwrap_or(&self.target)
    }

    fn discard(&mut self) {
        self.file = None;
        let _ = fs::remove_file(self.written_path());
    }
}

impl Drop for CdbWriter {
    fn drop(&mut self) {
        if self.file.is_some() {
            self.discard();
        }
    }
}

fn writer_closed() -> CdbError {
    CdbError::State("cdb writer is closed".to_string())
}

/// `tmp-<basename>` in the system temp directory.
pub(crate) fn default_tmp_path(target: &Path) -> Result<PathBuf> {
    let basename = target.file_name().ok_or_else(|| {
        CdbError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cdb path has no file name: {}", target.display()),
        ))
    })?;
    Ok(env::temp_dir().join(format!("tmp-{}", basename.to_string_lossy())))
}
