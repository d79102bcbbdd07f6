//! Command-line interface for one table-construction invocation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::otu::{build_otu_table, DEFAULT_OTU_PREFIX};
use crate::otu_table::write_outputs;

/// Build a taxonomy-resolved OTU abundance table from clustering and
/// reference-mapping output.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// UC-style hit file assigning raw clusters to reference sequences
    #[arg(long)]
    pub ref_hits: PathBuf,

    /// UC-style hit file mapping individual reads onto raw clusters
    #[arg(long)]
    pub read_hits: PathBuf,

    /// Two-column tab-delimited file mapping reference IDs to taxonomy lineages
    #[arg(short, long)]
    pub taxonomy: PathBuf,

    /// FASTA file of representative cluster sequences
    #[arg(short, long)]
    pub seqs: PathBuf,

    /// Output path for the flat text table
    #[arg(long)]
    pub out_text: PathBuf,

    /// Output path for the BIOM JSON table (its base name becomes the sample ID)
    #[arg(long)]
    pub out_biom: PathBuf,

    /// Literal prefix preceding the numeric cluster token in hit labels
    #[arg(long, default_value = DEFAULT_OTU_PREFIX)]
    pub otu_prefix: String,
}

/// Runs the whole construction; any error aborts before either output
/// file exists, so a failed invocation is safe to retry in full.
pub fn run(cli: &Cli) -> Result<()> {
    info!(
        "Building OTU table from {} and {}",
        cli.ref_hits.display(),
        cli.read_hits.display()
    );

    let table = build_otu_table(
        &cli.ref_hits,
        &cli.read_hits,
        &cli.taxonomy,
        &cli.seqs,
        &cli.otu_prefix,
    )
    .context("building OTU table")?;

    write_outputs(&table, &cli.out_text, &cli.out_biom).context("writing OTU tables")?;
    Ok(())
}
