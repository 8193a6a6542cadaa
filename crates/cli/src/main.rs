//! # CLI - constant database tools
//!
//! A thin command-line front end over the `cdb` and `dump` crates, covering
//! the classic make/dump/get workflow:
//!
//! ```text
//! make <cdb> <dump>      Build a database from a cdbmake dump file
//! dump <cdb> <out>       Write a database's records out in dump format
//! get <cdb> <key>        Print the first value stored under key
//! get <cdb> <key> --all  Print every value stored under key
//! ```
//!
//! `make` publishes atomically: the database is written to a temp file and
//! renamed into place, so a failed build leaves any existing target as it
//! was.
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli -- make airports.cdb airports.dump
//! built airports.cdb (3 records)
//! $ cargo run -p cli -- get airports.cdb LHR
//! London Heathrow
//! ```

use anyhow::{bail, Result};
use cdb::{Cdb, CdbBuilder};
use dump::DumpWriter;

const USAGE: &str = "usage: cli <command> [args]
  make <cdb> <dump>      build a database from a cdbmake dump file
  dump <cdb> <out>       write a database's records out in dump format
  get <cdb> <key>        print the first value stored under key
  get <cdb> <key> --all  print every value stored under key";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("make") => {
            let [_, cdb_path, dump_path] = args.as_slice() else {
                bail!("{}", USAGE);
            };
            CdbBuilder::build_from_dump(cdb_path, dump_path)?;
            let records = Cdb::open(cdb_path)?.iter().count();
            println!("built {} ({} records)", cdb_path, records);
        }
        Some("dump") => {
            let [_, cdb_path, out_path] = args.as_slice() else {
                bail!("{}", USAGE);
            };
            let db = Cdb::open(cdb_path)?;
            let mut out = DumpWriter::create(out_path)?;
            let mut records = 0usize;
            for record in db.iter() {
                let (key, value) = record?;
                out.write(&key, &value)?;
                records += 1;
            }
            out.close()?;
            println!("dumped {} ({} records)", cdb_path, records);
        }
        Some("get") => {
            let (cdb_path, key, all) = match args.as_slice() {
                [_, cdb_path, key] => (cdb_path, key, false),
                [_, cdb_path, key, flag] if flag == "--all" => (cdb_path, key, true),
                _ => bail!("{}", USAGE),
            };
            let db = Cdb::open(cdb_path)?;
            if all {
                let values = db.find_all(key.as_bytes())?;
                if values.is_empty() {
                    println!("(not found)");
                } else {
                    for value in values {
                        println!("{}", String::from_utf8_lossy(&value));
                    }
                }
            } else {
                match db.find_one(key.as_bytes())? {
                    Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                    None => println!("(not found)"),
                }
            }
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}
