//! Entry point for the OTU table construction pipeline.
//!
//! Converts raw sequence-similarity-search output (UC-style clustering
//! and reference-mapping hit records plus representative sequences)
//! into a taxonomy-resolved OTU abundance table, emitted as a flat
//! text summary and a BIOM-style sparse-matrix JSON document.

mod bio;
mod cli;
mod errors;
mod io;
mod otu;
mod otu_table;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cli::run(&cli)
}
