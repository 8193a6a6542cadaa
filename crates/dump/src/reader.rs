use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::{DumpError, MAX_DATA_LENGTH};

/// Lazy reader over the records of a dump file.
///
/// The reader is generic over any `Read` implementor, allowing it to be used
/// with real files (`DumpReader<File>`) or in-memory buffers for testing.
///
/// Iteration yields `(key, value)` byte pairs in file order and ends at the
/// terminating blank line. Any grammar violation — wrong record prefix, a
/// non-digit inside a length, an oversized length, a short read of key or
/// data, a missing separator, or end-of-file where the trailer should be —
/// produces [`DumpError::Format`], after which the input is closed and the
/// iterator stays exhausted.
#[derive(Debug)]
pub struct DumpReader<R: Read = File> {
    input: Option<BufReader<R>>,
}

impl DumpReader<File> {
    /// Opens a dump file for reading.
    ///
    /// Returns [`DumpError::Io`] if the file does not exist or cannot be
    /// opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<DumpReader<File>, DumpError> {
        let file = File::open(path)?;
        Ok(DumpReader {
            input: Some(BufReader::new(file)),
        })
    }
}

impl<R: Read> DumpReader<R> {
    /// Constructs a reader from any `Read` implementor.
    ///
    /// Useful for unit tests that supply an in-memory buffer (e.g.,
    /// `Cursor<Vec<u8>>`).
    pub fn from_reader(reader: R) -> Self {
        DumpReader {
            input: Some(BufReader::new(reader)),
        }
    }

    /// Closes the underlying input. Idempotent; iteration after close yields
    /// nothing.
    pub fn close(&mut self) {
        self.input = None;
    }

    /// Reads one record, the prefix `+` included. The caller has already
    /// peeked past the trailer check.
    fn read_record(input: &mut BufReader<R>) -> Result<(Vec<u8>, Vec<u8>), DumpError> {
        let prefix = read_byte(input)?;
        if prefix != b'+' {
            return Err(DumpError::Format(format!(
                "expected '+' at record start, read {:#04x}",
                prefix
            )));
        }

        let klen = read_length(input, b',')?;
        let dlen = read_length(input, b':')?;

        let mut key = vec![0u8; klen as usize];
        read_exact_or_format(input, &mut key, "key")?;
        expect_literal(input, b"->")?;

        let mut data = vec![0u8; dlen as usize];
        read_exact_or_format(input, &mut data, "data")?;
        expect_literal(input, b"\n")?;

        Ok((key, data))
    }
}

impl<R: Read> Iterator for DumpReader<R> {
    type Item = Result<(Vec<u8>, Vec<u8>), DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        let input = self.input.as_mut()?;

        // Peek a single byte: a newline here is the trailer, anything else
        // starts a record, and end-of-file means the trailer is missing.
        let next_byte = match input.fill_buf() {
            Ok(buf) => buf.first().copied(),
            Err(e) => {
                self.input = None;
                return Some(Err(DumpError::Io(e)));
            }
        };
        match next_byte {
            Some(b'\n') => {
                self.input = None;
                None
            }
            Some(_) => {
                let result = Self::read_record(input);
                if result.is_err() {
                    self.input = None;
                }
                Some(result)
            }
            None => {
                self.input = None;
                Some(Err(DumpError::Format(
                    "missing terminating blank line".to_string(),
                )))
            }
        }
    }
}

fn read_byte<R: Read>(input: &mut BufReader<R>) -> Result<u8, DumpError> {
    let mut buf = [0u8; 1];
    read_exact_or_format(input, &mut buf, "record")?;
    Ok(buf[0])
}

/// Parses a decimal length terminated by `terminator`: at least one digit,
/// digits only, value capped at [`MAX_DATA_LENGTH`].
fn read_length<R: Read>(input: &mut BufReader<R>, terminator: u8) -> Result<u32, DumpError> {
    let mut len: u64 = 0;
    let mut digits = 0usize;
    loop {
        let byte = read_byte(input)?;
        if byte == terminator {
            if digits == 0 {
                return Err(DumpError::Format(format!(
                    "expected a length before '{}'",
                    terminator as char
                )));
            }
            return Ok(len as u32);
        }
        if !byte.is_ascii_digit() {
            return Err(DumpError::Format(format!(
                "expected digit or '{}' in length, read {:#04x}",
                terminator as char, byte
            )));
        }
        len = len * 10 + u64::from(byte - b'0');
        digits += 1;
        if len > u64::from(MAX_DATA_LENGTH) {
            return Err(DumpError::Format(format!(
                "length {} exceeds maximum {}",
                len, MAX_DATA_LENGTH
            )));
        }
    }
}

fn expect_literal<R: Read>(input: &mut BufReader<R>, literal: &[u8]) -> Result<(), DumpError> {
    let mut buf = [0u8; 2];
    let buf = &mut buf[..literal.len()];
    read_exact_or_format(input, buf, "separator")?;
    if buf != literal {
        return Err(DumpError::Format(format!(
            "expected {:?}, read {:?}",
            String::from_utf8_lossy(literal),
            String::from_utf8_lossy(buf)
        )));
    }
    Ok(())
}

/// `read_exact` with end-of-file mapped to `Format`: running out of bytes
/// mid-record is a grammar violation, not an I/O failure.
fn read_exact_or_format<R: Read>(
    input: &mut BufReader<R>,
    buf: &mut [u8],
    what: &str,
) -> Result<(), DumpError> {
    input.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            DumpError::Format(format!("truncated {}", what))
        } else {
            DumpError::Io(e)
        }
    })
}
