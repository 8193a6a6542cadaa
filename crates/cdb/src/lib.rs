//! # cdb — constant database
//!
//! An implementation of D. J. Bernstein's constant database: an immutable,
//! on-disk, write-once key→multi-value store optimized for fast lookup by
//! key. Files produced here are byte-identical to files produced by the
//! reference `cdbmake` for the same input.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ MAIN TABLE (first 2048 bytes)                                 │
//! │                                                               │
//! │ 256 × [sub_table_offset: u32 | sub_table_slots: u32]          │
//! │ entry i covers every record whose key hash ≡ i (mod 256)      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ RECORDS REGION (insertion order)                              │
//! │                                                               │
//! │ key_len (u32) | data_len (u32) | key | data                   │
//! │                                                               │
//! │ ... repeated for each record ...                              │
//! ├───────────────────────────────────────────────────────────────┤
//! │ SUB-TABLES (one per non-empty bucket, concatenated)           │
//! │                                                               │
//! │ capacity × [hash: u32 | record_offset: u32]                   │
//! │ capacity = 2 × records in the bucket; linear probing from     │
//! │ slot (hash div 256) mod capacity; (_, 0) marks an empty slot  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. An empty database is 2048 bytes: 256
//! entries of `(2048, 0)` and no records. Record offsets, sub-table offsets,
//! and the total file size all fit in 32 bits.
//!
//! ## Module responsibilities
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | [`hash`]     | The cdb hash and its bucket/probe projections        |
//! | [`format`]   | Layout constants, u32-pair codec, main-table parsing |
//! | [`reader`]   | `Cdb`: point lookups and whole-file iteration        |
//! | [`writer`]   | `CdbWriter`: streaming build + sub-table emission    |
//! | [`builder`]  | `CdbBuilder`: dump-file and streaming orchestration  |
//!
//! ## Example
//!
//! ```rust,no_run
//! use cdb::{Cdb, CdbBuilder};
//!
//! let mut b = CdbBuilder::new("example.cdb").unwrap();
//! b.add(b"one", b"first").unwrap();
//! b.add(b"one", b"another").unwrap();
//! b.build().unwrap();
//!
//! let db = Cdb::open("example.cdb").unwrap();
//! assert_eq!(db.find_one(b"one").unwrap(), Some(b"first".to_vec()));
//! assert_eq!(db.find_all(b"one").unwrap().len(), 2);
//! ```
//!
//! ## Concurrency
//!
//! A [`Cdb`] is safe to share across threads: the single file handle sits
//! behind a mutex, every seek+read sequence holds the lock, and each iterator
//! keeps its own cursor. The writer side is single-owner; publication happens
//! by atomic rename of a temp file written in full.

mod builder;
mod error;
pub mod format;
mod hash;
mod reader;
mod writer;

pub use builder::CdbBuilder;
pub use error::{CdbError, Result};
pub use hash::{hash, Key};
pub use reader::{Cdb, CdbIter, KeyIter};
pub use writer::CdbWriter;

#[cfg(test)]
mod tests;
