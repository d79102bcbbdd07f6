//! Taxonomy-side utilities.
//!
//! Groups the reference taxonomy lookup and lineage handling used when
//! joining clustering hits against the reference database.

pub mod taxonomy;

pub use taxonomy::{load_taxonomy, split_lineage, TaxonomyLookup};
