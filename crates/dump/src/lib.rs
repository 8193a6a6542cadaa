//! # Dump — cdbmake record interchange format
//!
//! Reads and writes the textual dump format that `cdbmake` and `cdbdump`
//! exchange record streams in. A dump file is a sequence of records followed
//! by a terminating blank line:
//!
//! ```text
//! +klen,dlen:key->data\n
//! +klen,dlen:key->data\n
//! ...
//! \n
//! ```
//!
//! `klen` and `dlen` are decimal ASCII. `key` and `data` are raw bytes of
//! exactly those lengths and may contain any byte value, including `\n` and
//! `\r`, because the lengths are declared up front. No escaping exists; the
//! `->` separator and the record newline are literal bytes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dump::{DumpReader, DumpWriter};
//!
//! let mut w = DumpWriter::create("records.dump").unwrap();
//! w.write(b"hello", b"world").unwrap();
//! w.close().unwrap();
//!
//! let r = DumpReader::open("records.dump").unwrap();
//! for record in r {
//!     let (key, value) = record.unwrap();
//!     println!("{:?} -> {:?}", key, value);
//! }
//! ```

use std::io;

use thiserror::Error;

mod reader;
mod writer;

pub use reader::DumpReader;
pub use writer::DumpWriter;

/// Maximum permitted length for a single key or value (~256 MiB).
///
/// The cdb file the records end up in must keep every offset within 32 bits,
/// including the 2048-byte main table and the sub-tables; capping each field
/// well below 4 GiB keeps a single oversized record from ever getting close.
pub const MAX_DATA_LENGTH: u32 = 0x0fff_ffff;

/// Errors that can occur while reading or writing a dump file.
#[derive(Debug, Error)]
pub enum DumpError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The bytes were readable but violated the dump grammar.
    #[error("invalid dump format: {0}")]
    Format(String),
}

#[cfg(test)]
mod tests;
