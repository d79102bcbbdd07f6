//! OTU aggregation: the join-and-collapse core of the pipeline.
//!
//! Two passes over the clustering output build the table. The first
//! pass joins reference-assignment hits against the taxonomy lookup and
//! the representative-sequence store, producing one [`RawObservation`]
//! per raw cluster. The second pass counts per-read mapping hits into
//! those observations. Finally raw clusters that resolved to the same
//! reference taxon are collapsed into one [`AggregatedObservation`],
//! merging their identifiers, sequences, and summed abundance.
//!
//! Both maps preserve insertion order (`IndexMap`), so output row order
//! follows first encounter in the hit stream. Order is observable but
//! carries no semantics; observation identity is the contract.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use log::{info, warn};

use crate::bio::taxonomy::{load_taxonomy, TaxonomyLookup};
use crate::errors::TableError;
use crate::io::fasta::read_sequence_store;
use crate::io::hits::{cluster_label, HitReader, HitRecord};

/// Default literal prefix preceding the numeric cluster token in hit
/// labels produced by the upstream clustering tool.
pub const DEFAULT_OTU_PREFIX: &str = "OTU_";

/// One raw cluster joined to its best reference match.
///
/// Immutable once built, except `abundance`, which is incremented while
/// counting per-read mapping hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObservation {
    /// Lineage string taken from the taxonomy lookup.
    pub taxonomy: String,
    /// Representative sequence of the raw cluster.
    pub representative_sequence: String,
    /// Per-read hit count for this cluster.
    pub abundance: u64,
    /// Identifier of the best-matching reference sequence; the
    /// collapse key.
    pub reference_taxon_id: String,
}

/// All raw clusters that resolved to one reference taxon, merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedObservation {
    /// Lineage of the first contributing raw cluster. All members of a
    /// group share it by construction (same reference taxon).
    pub taxonomy: String,
    /// Contributing raw cluster labels, in first-encounter order.
    pub raw_ids: Vec<String>,
    /// Representative sequences of the contributors, same order.
    pub sequences: Vec<String>,
    /// Sum of the contributors' abundances.
    pub total_abundance: u64,
}

/// Final table: reference taxon ID -> merged observation, in order of
/// first encounter.
pub type OtuTable = IndexMap<String, AggregatedObservation>;

/// First pass: builds one `RawObservation` per reference-assignment hit.
///
/// The query label names the raw cluster (and keys the sequence store);
/// the target label names the reference taxon. A reference taxon absent
/// from the lookup or a query label absent from the store aborts the
/// whole construction; there is no silent defaulting.
pub fn assign_references(
    hits: impl Iterator<Item = Result<HitRecord, TableError>>,
    taxonomy: &TaxonomyLookup,
    store: &HashMap<String, String>,
    prefix: &str,
    path: &Path,
) -> Result<IndexMap<String, RawObservation>, TableError> {
    let mut raw = IndexMap::new();
    for hit in hits {
        let hit = hit?;
        let label = cluster_label(&hit.query, prefix).ok_or_else(|| TableError::Format {
            path: path.to_path_buf(),
            line: hit.line,
            msg: format!("query label '{}' embeds no '{}<n>' cluster token", hit.query, prefix),
        })?;
        let lineage = taxonomy
            .get(&hit.target)
            .ok_or_else(|| TableError::MissingTaxonomy {
                reference_id: hit.target.clone(),
            })?;
        let sequence = store
            .get(&hit.query)
            .ok_or_else(|| TableError::MissingSequence {
                label: hit.query.clone(),
            })?;
        raw.insert(
            label,
            RawObservation {
                taxonomy: lineage.clone(),
                representative_sequence: sequence.clone(),
                abundance: 0,
                reference_taxon_id: hit.target,
            },
        );
    }
    Ok(raw)
}

/// Second pass: counts per-read mapping hits into the raw observations.
///
/// Each hit whose target label resolves to a known raw cluster bumps
/// that cluster's abundance by one. Hits naming unknown clusters (never
/// assigned a reference, or filtered upstream) are not counted; they are
/// tallied and returned so the caller can surface the drop count.
pub fn count_read_hits(
    hits: impl Iterator<Item = Result<HitRecord, TableError>>,
    raw: &mut IndexMap<String, RawObservation>,
    prefix: &str,
) -> Result<u64, TableError> {
    let mut dropped = 0u64;
    for hit in hits {
        let hit = hit?;
        let counted = cluster_label(&hit.target, prefix)
            .and_then(|label| raw.get_mut(&label))
            .map(|obs| obs.abundance += 1)
            .is_some();
        if !counted {
            dropped += 1;
        }
    }
    Ok(dropped)
}

/// Collapses raw observations by reference taxon.
///
/// Group member order is insertion order from the first pass; the first
/// member supplies the group's taxonomy.
pub fn collapse(raw: IndexMap<String, RawObservation>) -> OtuTable {
    let mut table = OtuTable::new();
    for (label, obs) in raw {
        let entry = table
            .entry(obs.reference_taxon_id)
            .or_insert_with(|| AggregatedObservation {
                taxonomy: obs.taxonomy,
                raw_ids: Vec::new(),
                sequences: Vec::new(),
                total_abundance: 0,
            });
        entry.raw_ids.push(label);
        entry.sequences.push(obs.representative_sequence);
        entry.total_abundance += obs.abundance;
    }
    table
}

/// Runs the full construction: load lookups, join, count, collapse.
///
/// Fails before any output is written if an input is malformed or a
/// join misses; the caller treats the whole construction as atomic.
pub fn build_otu_table(
    ref_hits: &Path,
    read_hits: &Path,
    taxonomy_path: &Path,
    seqs_path: &Path,
    prefix: &str,
) -> Result<OtuTable, TableError> {
    let taxonomy = load_taxonomy(taxonomy_path)?;
    let store = read_sequence_store(seqs_path)?;

    let mut raw = assign_references(
        HitReader::open(ref_hits)?,
        &taxonomy,
        &store,
        prefix,
        ref_hits,
    )?;
    info!(
        "Assigned {} raw clusters to reference taxa from {}",
        raw.len(),
        ref_hits.display()
    );

    let dropped = count_read_hits(HitReader::open(read_hits)?, &mut raw, prefix)?;
    if dropped > 0 {
        warn!(
            "{} per-read mapping hits referenced unknown clusters and were not counted",
            dropped
        );
    }

    let table = collapse(raw);
    info!("Collapsed into {} observations", table.len());
    Ok(table)
}
