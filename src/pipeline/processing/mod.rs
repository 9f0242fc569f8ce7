// Pipeline processing: normalization, filtering, reconciliation, enrichment and projection

pub mod enrich;
pub mod filter;
pub mod normalize;
pub mod project;
pub mod reconcile;
pub mod supplier;
