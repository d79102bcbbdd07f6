//! Error types for table construction.
//!
//! All variants are fatal for the current invocation: the pipeline never
//! skips-and-continues past a malformed input or a failed join, and no
//! output file is persisted once an error has surfaced.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    /// Malformed input: a FASTA file that does not open with a header,
    /// a hit row too short for the columns being read, or a label that
    /// does not embed a cluster identifier.
    #[error("{}:{}: {}", .path.display(), .line, .msg)]
    Format {
        path: PathBuf,
        line: u64,
        msg: String,
    },

    /// A reference taxon named by a reference-assignment hit has no
    /// entry in the taxonomy lookup.
    #[error("reference taxon '{reference_id}' has no entry in the taxonomy lookup")]
    MissingTaxonomy { reference_id: String },

    /// A query label named by a reference-assignment hit has no entry
    /// in the sequence store.
    #[error("query label '{label}' has no entry in the sequence store")]
    MissingSequence { label: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("record parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
