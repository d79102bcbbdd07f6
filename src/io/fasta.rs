//! Lazy FASTA parsing for the representative-sequence store.
//!
//! Representative sequence files can be large, so records are produced
//! one at a time from a buffered line iterator. Downstream lookups are
//! random-access, so [`read_sequence_store`] drains the reader into a
//! complete map before use.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use log::info;

use crate::errors::TableError;
use crate::io::open_maybe_gzip;

/// One FASTA record: the identifier is the first whitespace-delimited
/// token after `>`, the sequence is every following non-header line
/// concatenated with no separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub sequence: String,
}

/// Streaming FASTA reader.
///
/// End-of-record detection is explicit: the header that terminates the
/// current record is buffered for the next call, and the final record
/// is flushed when the line iterator reports end of input. A header
/// with no body lines yields an empty sequence. If the first non-blank
/// line of the input is not a header, iteration fails with
/// [`TableError::Format`].
pub struct FastaReader<R: BufRead> {
    lines: std::io::Lines<R>,
    pending_header: Option<String>,
    path: PathBuf,
    line_no: u64,
    done: bool,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        FastaReader {
            lines: reader.lines(),
            pending_header: None,
            path: path.into(),
            line_no: 0,
            done: false,
        }
    }

    fn format_error(&mut self, msg: &str) -> TableError {
        self.done = true;
        TableError::Format {
            path: self.path.clone(),
            line: self.line_no,
            msg: msg.to_string(),
        }
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Locate the header that opens this record, either buffered
        // from the previous record or read fresh from the input.
        let header = match self.pending_header.take() {
            Some(header) => header,
            None => loop {
                match self.lines.next() {
                    Some(Ok(line)) => {
                        self.line_no += 1;
                        if line.trim().is_empty() {
                            continue;
                        }
                        match line.strip_prefix('>') {
                            Some(rest) => break rest.to_string(),
                            None => {
                                return Some(Err(self.format_error(
                                    "expected FASTA header line starting with '>'",
                                )))
                            }
                        }
                    }
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            },
        };

        let id = header
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        // Accumulate body lines until the next header or end of input.
        let mut sequence = String::new();
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_no += 1;
                    if let Some(rest) = line.strip_prefix('>') {
                        self.pending_header = Some(rest.to_string());
                        break;
                    }
                    sequence.push_str(line.trim_end());
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        Some(Ok(FastaRecord { id, sequence }))
    }
}

/// Loads a FASTA file (plain or gzipped) into an id -> sequence map.
///
/// Later records with a duplicate identifier replace earlier ones,
/// matching the lookup maps elsewhere in the pipeline.
pub fn read_sequence_store(path: &Path) -> Result<HashMap<String, String>, TableError> {
    let reader = open_maybe_gzip(path)?;
    let mut store = HashMap::new();
    for record in FastaReader::new(reader, path) {
        let record = record?;
        store.insert(record.id, record.sequence);
    }
    info!(
        "Loaded {} representative sequences from {}",
        store.len(),
        path.display()
    );
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;

    fn records(input: &str) -> Vec<FastaRecord> {
        FastaReader::new(Cursor::new(input.to_string()), "test.fasta")
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_parse_basic_records() {
        let recs = records(">OTU_1 some description\nACGT\nTTAA\n>OTU_2\nGGCC\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "OTU_1");
        assert_eq!(recs[0].sequence, "ACGTTTAA");
        assert_eq!(recs[1].id, "OTU_2");
        assert_eq!(recs[1].sequence, "GGCC");
    }

    #[test]
    fn test_header_without_body_yields_empty_sequence() {
        let recs = records(">empty\n>OTU_1\nACGT\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].id, "empty");
        assert_eq!(recs[0].sequence, "");
        assert_eq!(recs[1].sequence, "ACGT");
    }

    #[test]
    fn test_empty_input_yields_no_records() {
        assert!(records("").is_empty());
        assert!(records("\n\n").is_empty());
    }

    #[test]
    fn test_missing_leading_header_is_format_error() {
        let mut reader = FastaReader::new(Cursor::new("ACGT\n>OTU_1\nACGT\n"), "bad.fasta");
        let err = reader.next().unwrap().unwrap_err();
        assert!(matches!(err, TableError::Format { line: 1, .. }));
        // Iteration stops after the error.
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_sequence_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reps.fasta");
        let mut file = File::create(&path).unwrap();
        write!(file, ">OTU_1\nACGT\n>OTU_2\nTT\nGG\n").unwrap();

        let store = read_sequence_store(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store["OTU_1"], "ACGT");
        assert_eq!(store["OTU_2"], "TTGG");
    }

    #[test]
    fn test_read_sequence_store_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reps.fasta.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b">OTU_9\nACACAC\n").unwrap();
        encoder.finish().unwrap();

        let store = read_sequence_store(&path).unwrap();
        assert_eq!(store["OTU_9"], "ACACAC");
    }
}
