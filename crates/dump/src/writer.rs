use std::env;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::DumpError;

/// Appends records to a dump file and terminates it with a blank line.
///
/// Two construction modes:
///
/// - [`create`](DumpWriter::create) writes the target path directly,
///   truncating any existing file.
/// - [`create_atomic`](DumpWriter::create_atomic) writes a temp file in the
///   system temp directory and renames it over the target on
///   [`close`](DumpWriter::close), so readers never observe a partial dump.
///
/// `close` flushes and fsyncs before the rename. A failed write or close
/// deletes the file being written and surfaces the error; dropping an
/// unclosed writer does the same cleanup.
pub struct DumpWriter {
    out: Option<BufWriter<File>>,
    target: PathBuf,
    /// `Some` in atomic mode: the path actually being written, renamed to
    /// `target` on close.
    tmp: Option<PathBuf>,
}

impl DumpWriter {
    /// Opens `path` for writing, truncating any existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, DumpError> {
        let target = path.as_ref().to_path_buf();
        let file = File::create(&target)?;
        Ok(DumpWriter {
            out: Some(BufWriter::new(file)),
            target,
            tmp: None,
        })
    }

    /// Opens a temp file `tmp-<basename>` in the system temp directory;
    /// `close` renames it over `path`, replacing any existing file.
    ///
    /// The rename is atomic only within one filesystem; if the temp directory
    /// lives elsewhere the rename fails and the temp file is removed.
    pub fn create_atomic<P: AsRef<Path>>(path: P) -> Result<Self, DumpError> {
        let target = path.as_ref().to_path_buf();
        let basename = target.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("dump path has no file name: {}", target.display()),
            )
        })?;
        let tmp = env::temp_dir().join(format!("tmp-{}", basename.to_string_lossy()));
        let file = File::create(&tmp)?;
        Ok(DumpWriter {
            out: Some(BufWriter::new(file)),
            target,
            tmp: Some(tmp),
        })
    }

    /// Appends one `+klen,dlen:key->data` record.
    pub fn write(&mut self, key: &[u8], value: &[u8]) -> Result<(), DumpError> {
        let out = self.out.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "dump writer is closed")
        })?;
        let result = write_record(out, key, value);
        if result.is_err() {
            self.discard();
        }
        result.map_err(DumpError::Io)
    }

    /// Writes the terminating blank line, flushes durably, and in atomic mode
    /// renames the temp file over the target. Idempotent.
    pub fn close(&mut self) -> Result<(), DumpError> {
        let Some(mut out) = self.out.take() else {
            return Ok(());
        };

        let finish = out
            .write_all(b"\n")
            .and_then(|()| out.flush())
            .and_then(|()| out.get_ref().sync_all());
        if let Err(e) = finish {
            drop(out);
            let _ = fs::remove_file(self.written_path());
            return Err(DumpError::Io(e));
        }
        drop(out);

        if let Some(tmp) = &self.tmp {
            if let Err(e) = fs::rename(tmp, &self.target) {
                let _ = fs::remove_file(tmp);
                return Err(DumpError::Io(e));
            }
        }
        Ok(())
    }

    /// The path currently being written: the temp file in atomic mode, the
    /// target itself in direct mode.
    fn written_path(&self) -> &Path {
        self.tmp.as_deref().unwrap_or(&self.target)
    }

    fn discard(&mut self) {
        self.out = None;
        let _ = fs::remove_file(self.written_path());
    }
}

impl Drop for DumpWriter {
    fn drop(&mut self) {
        if self.out.is_some() {
            self.discard();
        }
    }
}

fn write_record(out: &mut BufWriter<File>, key: &[u8], value: &[u8]) -> io::Result<()> {
    write!(out, "+{},{}:", key.len(), value.len())?;
    out.write_all(key)?;
    out.write_all(b"->")?;
    out.write_all(value)?;
    out.write_all(b"\n")?;
    Ok(())
}
