use std::path::Path;

use dump::DumpReader;

use crate::error::Result;
use crate::writer::CdbWriter;

/// Builds a constant database, either from a dump file or by streaming
/// records in, always publishing by atomic rename.
///
/// The database is written to a temp file (by default
/// `tmp-<basename>` in the system temp directory) and renamed over the
/// target only when complete, so the target is never observed half-built:
/// a failed build leaves it exactly as it was.
pub struct CdbBuilder {
    writer: CdbWriter,
}

impl CdbBuilder {
    /// Starts a streaming build of `cdb_path`.
    pub fn new<P: AsRef<Path>>(cdb_path: P) -> Result<Self> {
        Ok(CdbBuilder {
            writer: CdbWriter::create_atomic(cdb_path)?,
        })
    }

    /// Starts a streaming build with an explicit temp path. The temp path
    /// must be on the same filesystem as the target for the final rename to
    /// be atomic.
    pub fn with_tmp_path<P: AsRef<Path>, Q: AsRef<Path>>(cdb_path: P, tmp_path: Q) -> Result<Self> {
        Ok(CdbBuilder {
            writer: CdbWriter::with_tmp_path(cdb_path, tmp_path)?,
        })
    }

    /// Appends one record.
    pub fn add(&mut self, key: &[u8], data: &[u8]) -> Result<()> {
        self.writer.add(key, data)
    }

    /// Finalizes and publishes the database.
    pub fn build(mut self) -> Result<()> {
        self.writer.close()
    }

    /// Builds `cdb_path` from the dump file at `dump_path`.
    ///
    /// A missing dump fails with [`CdbError::Io`](crate::CdbError::Io)
    /// before any temp file exists; a malformed dump surfaces
    /// [`CdbError::Format`](crate::CdbError::Format) and the temp file is
    /// removed. Either way the target is untouched.
    pub fn build_from_dump<P: AsRef<Path>, Q: AsRef<Path>>(
        cdb_path: P,
        dump_path: Q,
    ) -> Result<()> {
        let reader = DumpReader::open(dump_path)?;
        let writer = CdbWriter::create_atomic(cdb_path)?;
        Self::drain(reader, writer)
    }

    /// Like [`build_from_dump`](CdbBuilder::build_from_dump) with an
    /// explicit temp path.
    pub fn build_from_dump_with<P, Q, R>(cdb_path: P, dump_path: Q, tmp_path: R) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let reader = DumpReader::open(dump_path)?;
        let writer = CdbWriter::with_tmp_path(cdb_path, tmp_path)?;
        Self::drain(reader, writer)
    }

    fn drain(reader: DumpReader, mut writer: CdbWriter) -> Result<()> {
        for record in reader {
            let (key, data) = record?;
            writer.add(&key, &data)?;
        }
        writer.close()
    }
}
