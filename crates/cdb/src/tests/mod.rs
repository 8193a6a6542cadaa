mod format_tests;

use std::path::Path;

use crate::{CdbWriter, Result};

/// Builds a database at `path` from the given records, publishing atomically
/// through a temp file next to the target.
pub fn build_db(path: &Path, records: &[(&[u8], &[u8])]) -> Result<()> {
    let mut w = CdbWriter::with_tmp_path(path, path.with_extension("cdb.tmp"))?;
    for (key, data) in records {
        w.add(key, data)?;
    }
    w.close()
}
