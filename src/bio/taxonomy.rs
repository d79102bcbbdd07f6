//! Reference taxonomy lookup.
//!
//! The reference database ships a two-column tab-delimited file mapping
//! each reference sequence identifier to its taxonomy lineage string
//! (semicolon-space-delimited ranks, e.g. `"k__Bacteria; p__Firmicutes"`).
//! The lookup is loaded eagerly: every reference-assignment hit performs
//! a random-access join against it.

use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use log::info;

use crate::errors::TableError;
use crate::io::open_maybe_gzip;

/// Reference sequence identifier -> taxonomy lineage string.
pub type TaxonomyLookup = HashMap<String, String>;

/// Loads a two-column taxonomy file (plain or gzipped) into a lookup.
///
/// Duplicate reference IDs are not an error; the last occurrence wins.
/// The lineage string's internal structure is not validated here.
pub fn load_taxonomy(path: &Path) -> Result<TaxonomyLookup, TableError> {
    let reader = open_maybe_gzip(path)?;
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut lookup = TaxonomyLookup::new();
    for result in csv_reader.records() {
        let record = result?;
        if record.len() < 2 {
            return Err(TableError::Format {
                path: path.to_path_buf(),
                line: record.position().map_or(0, csv::Position::line),
                msg: format!(
                    "taxonomy row has {} columns, expected 2 (reference ID, lineage)",
                    record.len()
                ),
            });
        }
        lookup.insert(record[0].to_string(), record[1].to_string());
    }
    info!(
        "Loaded {} taxonomy entries from {}",
        lookup.len(),
        path.display()
    );
    Ok(lookup)
}

/// Splits a lineage string into its ranks on the `"; "` separator, for
/// per-rank observation metadata in the BIOM output.
pub fn split_lineage(lineage: &str) -> Vec<String> {
    lineage.split("; ").map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_taxonomy(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taxonomy.txt");
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_taxonomy_basic() {
        let (_dir, path) = write_taxonomy(
            "ref1\tk__Bacteria; p__Firmicutes\nref2\tk__Bacteria; p__Bacteroidetes\n",
        );
        let lookup = load_taxonomy(&path).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup["ref1"], "k__Bacteria; p__Firmicutes");
        assert_eq!(lookup["ref2"], "k__Bacteria; p__Bacteroidetes");
    }

    #[test]
    fn test_load_taxonomy_duplicate_last_wins() {
        let (_dir, path) = write_taxonomy("ref1\tk__Old\nref1\tk__New\n");
        let lookup = load_taxonomy(&path).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["ref1"], "k__New");
    }

    #[test]
    fn test_load_taxonomy_short_row_is_format_error() {
        let (_dir, path) = write_taxonomy("ref1\tk__Bacteria\nref2\n");
        let err = load_taxonomy(&path).unwrap_err();
        assert!(matches!(err, TableError::Format { line: 2, .. }));
    }

    #[test]
    fn test_load_taxonomy_gzip() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempdir().unwrap();
        let path = dir.path().join("taxonomy.txt.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(b"ref1\tk__Bacteria; p__Firmicutes\n")
            .unwrap();
        encoder.finish().unwrap();

        let lookup = load_taxonomy(&path).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup["ref1"], "k__Bacteria; p__Firmicutes");
    }

    #[test]
    fn test_split_lineage() {
        assert_eq!(
            split_lineage("k__Bacteria; p__Firmicutes; c__Bacilli"),
            vec!["k__Bacteria", "p__Firmicutes", "c__Bacilli"]
        );
        assert_eq!(split_lineage("k__Bacteria"), vec!["k__Bacteria"]);
    }
}
