//! Aggregation and ordering of rendered documents.

pub mod aggregate;
pub mod sort;

pub use aggregate::{NamedDocument, OutputSet};
pub use sort::sort_by_kind;
