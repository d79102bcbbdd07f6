//! Input parsing for the table construction pipeline.
//!
//! Both readers are lazy record iterators so that large clustering
//! result files and reference FASTA files are never fully materialized
//! before the first record is available.

pub mod fasta; // Sub-module for FASTA sequence stores
pub mod hits; // Sub-module for tab-delimited hit records

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Opens a file for buffered reading, decompressing transparently when
/// the path carries a `.gz` extension.
pub fn open_maybe_gzip(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
