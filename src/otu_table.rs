//! Output rendering for the aggregated OTU table.
//!
//! Two canonical formats are produced from the same aggregate map: a
//! flat two-column text summary and a BIOM-style sparse-matrix JSON
//! document carrying per-observation metadata. Both outputs are staged
//! through temporary files and renamed into place only after each has
//! serialized without error, so a failed invocation leaves neither.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::bio::taxonomy::split_lineage;
use crate::errors::TableError;
use crate::otu::OtuTable;

/// Fixed identifier carried by every emitted BIOM document.
pub const BIOM_TABLE_ID: &str = "OTU table";
const BIOM_FORMAT: &str = "Biological Observation Matrix 0.9.1-dev";
const BIOM_FORMAT_URL: &str = "http://biom-format.org";

/// Writes the flat text table: header `Taxonomy\tCount`, then one
/// `"{taxonomy}:{reference_id}"\t{count}` row per observation, in map
/// iteration order. Taxonomy strings are trusted tab/newline-free; no
/// escaping is applied.
pub fn write_flat_table<W: Write>(table: &OtuTable, mut writer: W) -> io::Result<()> {
    writeln!(writer, "Taxonomy\tCount")?;
    for (reference_id, obs) in table {
        writeln!(
            writer,
            "{}:{}\t{}",
            obs.taxonomy, reference_id, obs.total_abundance
        )?;
    }
    writer.flush()
}

/// BIOM v1-style sparse table document, single sample column.
#[derive(Debug, Serialize)]
pub struct BiomTable {
    id: String,
    format: String,
    format_url: String,
    #[serde(rename = "type")]
    table_type: String,
    generated_by: String,
    matrix_type: String,
    matrix_element_type: String,
    /// `[observations, samples]`; samples is always 1 here.
    shape: [usize; 2],
    rows: Vec<BiomRow>,
    columns: Vec<BiomColumn>,
    /// Sparse triples `[row, column, count]`. Row indices align
    /// positionally with `rows`; this is a hard invariant of the
    /// format.
    data: Vec<[u64; 3]>,
}

#[derive(Debug, Serialize)]
struct BiomRow {
    id: String,
    metadata: BiomRowMetadata,
}

#[derive(Debug, Serialize)]
struct BiomRowMetadata {
    taxonomy: Vec<String>,
    otusequences: Vec<String>,
}

#[derive(Debug, Serialize)]
struct BiomColumn {
    id: String,
    metadata: Option<()>,
}

/// Builds the BIOM document for one sample from the aggregate map.
pub fn biom_table(table: &OtuTable, sample_id: &str) -> BiomTable {
    let mut rows = Vec::with_capacity(table.len());
    let mut data = Vec::with_capacity(table.len());
    for (row_idx, (reference_id, obs)) in table.iter().enumerate() {
        rows.push(BiomRow {
            id: reference_id.clone(),
            metadata: BiomRowMetadata {
                taxonomy: split_lineage(&obs.taxonomy),
                otusequences: obs.sequences.clone(),
            },
        });
        data.push([row_idx as u64, 0, obs.total_abundance]);
    }
    BiomTable {
        id: BIOM_TABLE_ID.to_string(),
        format: BIOM_FORMAT.to_string(),
        format_url: BIOM_FORMAT_URL.to_string(),
        table_type: BIOM_TABLE_ID.to_string(),
        generated_by: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        matrix_type: "sparse".to_string(),
        matrix_element_type: "int".to_string(),
        shape: [table.len(), 1],
        rows,
        columns: vec![BiomColumn {
            id: sample_id.to_string(),
            metadata: None,
        }],
        data,
    }
}

/// Serializes the BIOM document as JSON.
pub fn write_biom_table<W: Write>(
    table: &OtuTable,
    sample_id: &str,
    mut writer: W,
) -> Result<(), TableError> {
    serde_json::to_writer(&mut writer, &biom_table(table, sample_id))?;
    writer.flush()?;
    Ok(())
}

/// Writes both output files atomically.
///
/// Each table is serialized into a temporary file in its destination
/// directory; only once both have succeeded are they renamed into
/// place. The BIOM sample identifier is the base name of the BIOM
/// output path with its extension stripped.
pub fn write_outputs(table: &OtuTable, out_text: &Path, out_biom: &Path) -> Result<(), TableError> {
    let sample_id = out_biom
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sample");

    let mut text_tmp = NamedTempFile::new_in(staging_dir(out_text))?;
    write_flat_table(table, BufWriter::new(text_tmp.as_file_mut()))?;

    let mut biom_tmp = NamedTempFile::new_in(staging_dir(out_biom))?;
    write_biom_table(table, sample_id, BufWriter::new(biom_tmp.as_file_mut()))?;

    text_tmp.persist(out_text).map_err(|e| e.error)?;
    if let Err(e) = biom_tmp.persist(out_biom) {
        // Both outputs or neither: roll back the first rename if the
        // second fails.
        let _ = fs::remove_file(out_text);
        return Err(e.error.into());
    }
    info!(
        "Wrote {} observations to {} and {}",
        table.len(),
        out_text.display(),
        out_biom.display()
    );
    Ok(())
}

fn staging_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
