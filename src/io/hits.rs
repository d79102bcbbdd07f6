//! Lazy reader for tab-delimited clustering/mapping hit records.
//!
//! The same reader serves both streams the aggregator consumes: the
//! reference-assignment stream (raw cluster -> best reference match)
//! and the per-read mapping stream (read -> raw cluster). Only rows
//! whose first column is the literal hit marker `H` are yielded; the
//! two streams differ only in how the caller interprets the query and
//! target labels. Restarting a stream means reopening the file.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::errors::TableError;
use crate::io::open_maybe_gzip;

/// Record-type marker of rows this pipeline consumes.
pub const HIT_MARKER: &str = "H";
/// 0-indexed column holding the query label.
pub const QUERY_COL: usize = 8;
/// 0-indexed column holding the target label.
pub const TARGET_COL: usize = 9;

/// One accepted hit row, reduced to the columns the aggregator reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRecord {
    pub query: String,
    pub target: String,
    /// 1-based source line, carried for error reporting.
    pub line: u64,
}

/// Streaming reader over the `H` rows of a hit file.
pub struct HitReader {
    records: csv::StringRecordsIntoIter<Box<dyn BufRead>>,
    path: PathBuf,
}

impl HitReader {
    /// Opens a hit file (plain or gzipped) for one streaming pass.
    pub fn open(path: &Path) -> Result<Self, TableError> {
        let reader = open_maybe_gzip(path)?;
        let csv_reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        Ok(HitReader {
            records: csv_reader.into_records(),
            path: path.to_path_buf(),
        })
    }
}

impl Iterator for HitReader {
    type Item = Result<HitRecord, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            if record.get(0) != Some(HIT_MARKER) {
                continue;
            }
            let line = record.position().map_or(0, csv::Position::line);
            if record.len() <= TARGET_COL {
                return Some(Err(TableError::Format {
                    path: self.path.clone(),
                    line,
                    msg: format!(
                        "hit row has {} columns, expected at least {}",
                        record.len(),
                        TARGET_COL + 1
                    ),
                }));
            }
            return Some(Ok(HitRecord {
                query: record[QUERY_COL].to_string(),
                target: record[TARGET_COL].to_string(),
                line,
            }));
        }
    }
}

/// Recovers the canonical raw cluster label embedded in a hit label:
/// the fixed literal `prefix` followed by its numeric token. Returns
/// `None` when the label carries no prefix or no digits after it.
pub fn cluster_label(label: &str, prefix: &str) -> Option<String> {
    let start = label.find(prefix)? + prefix.len();
    let digits: &str = {
        let rest = &label[start..];
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(rest.len(), |(i, _)| i);
        &rest[..end]
    };
    if digits.is_empty() {
        None
    } else {
        Some(format!("{prefix}{digits}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_hits(path: &Path, content: &str) {
        let mut file = File::create(path).unwrap();
        write!(file, "{}", content).unwrap();
    }

    fn hit_row(marker: &str, query: &str, target: &str) -> String {
        // uc-style row: marker, 7 bookkeeping columns, query, target
        format!("{}\t0\t4\t100.0\t+\t0\t0\t4M\t{}\t{}\n", marker, query, target)
    }

    #[test]
    fn test_only_hit_rows_are_yielded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.uc");
        let content = format!(
            "{}{}{}{}",
            hit_row("S", "OTU_1", "*"),
            hit_row("H", "OTU_1", "ref1"),
            hit_row("N", "OTU_2", "*"),
            hit_row("H", "OTU_2", "ref2"),
        );
        write_hits(&path, &content);

        let hits: Vec<HitRecord> = HitReader::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].query, "OTU_1");
        assert_eq!(hits[0].target, "ref1");
        assert_eq!(hits[1].query, "OTU_2");
        assert_eq!(hits[1].line, 4);
    }

    #[test]
    fn test_short_hit_row_is_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.uc");
        write_hits(&path, "H\t0\t4\n");

        let err = HitReader::open(&path).unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, TableError::Format { .. }));
    }

    #[test]
    fn test_short_non_hit_rows_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.uc");
        let content = format!("C\t0\t12\n{}", hit_row("H", "OTU_3", "ref9"));
        write_hits(&path, &content);

        let hits: Vec<HitRecord> = HitReader::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, "ref9");
    }

    #[test]
    fn test_gzipped_hit_file_parses_identically() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempdir().unwrap();
        let path = dir.path().join("results.uc.gz");
        let content = format!("{}{}", hit_row("S", "OTU_1", "*"), hit_row("H", "OTU_1", "ref1"));
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let hits: Vec<HitRecord> = HitReader::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].query, "OTU_1");
        assert_eq!(hits[0].target, "ref1");
    }

    #[test]
    fn test_cluster_label_extraction() {
        assert_eq!(cluster_label("OTU_12", "OTU_"), Some("OTU_12".to_string()));
        assert_eq!(
            cluster_label("OTU_12;size=40", "OTU_"),
            Some("OTU_12".to_string())
        );
        assert_eq!(
            cluster_label("sample1_OTU_7", "OTU_"),
            Some("OTU_7".to_string())
        );
        assert_eq!(cluster_label("read_991", "OTU_"), None);
        assert_eq!(cluster_label("OTU_", "OTU_"), None);
        assert_eq!(cluster_label("OTU_x4", "OTU_"), None);
    }
}
